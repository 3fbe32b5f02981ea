use bytes::{BufMut, BytesMut};
use std::io;

/// `io::Write` adapter so `write!` can format straight into a `BytesMut`.
pub(crate) struct Writer<'a>(pub &'a mut BytesMut);

impl io::Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
