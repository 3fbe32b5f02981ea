use bytes::Bytes;

/// An outbound frame: either the response head or one payload item.
///
/// The response encoder consumes a `Header` first and then payload items
/// until `Eof`, unless the head announced [`PayloadSize::Empty`].
#[derive(Debug)]
pub enum Message<T> {
    Header(T),
    Payload(PayloadItem),
}

/// One unit of an outbound payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    /// Marks the end of the payload stream
    Eof,
}

/// How the payload following a head is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length` framed payload
    Length(u64),
    /// `Transfer-Encoding: chunked` framed payload
    Chunked,
    /// Header only, nothing follows
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }
}
