use std::hint::black_box;
use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use http::StatusCode;
use sealed_http::handler::make_handler;
use sealed_http::{
    codec::{RequestDecoder, ResponseEncoder},
    connection::HttpConnection,
    protocol::{Message, PayloadSize, Response, ResponseHead},
    secure::SessionCipher,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::{Decoder, Encoder};

// Mock IO for testing
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

const SIMPLE_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

const CHUNKED_REQUEST: &[u8] =
    b"POST /upload HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n4\r\ndata\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n";

fn bench_request_decoder(c: &mut Criterion) {
    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(SIMPLE_REQUEST);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    c.bench_function("decode_chunked_request_bytewise", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::new();
            for byte in CHUNKED_REQUEST {
                bytes.extend_from_slice(&[*byte]);
                if let Some(request) = decoder.decode(&mut bytes).unwrap() {
                    black_box(request);
                }
            }
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            let body = Bytes::from_static(b"Hello World!");
            let message = Message::Header((ResponseHead::new(StatusCode::OK), PayloadSize::Length(body.len() as u64)));
            encoder.encode(message, &mut bytes).unwrap();
            encoder.encode(Message::from(body), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_session_cipher(c: &mut Criterion) {
    let cipher = SessionCipher::new([3; 16], [5; 16]);
    let payload = vec![b'x'; 4096];

    c.bench_function("encrypt_4k_chunk", |b| {
        b.iter(|| black_box(cipher.encrypt(&payload).unwrap()));
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let handler = Arc::new(make_handler(|exchange| {
        Box::pin(async move {
            exchange.set_response(Response::with_body(StatusCode::OK, "text/plain", "Hello World!"));
            Ok(())
        })
    }));

    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let mock_io = MockIO::new(SIMPLE_REQUEST.to_vec());
            let (reader, writer) = (mock_io.clone(), mock_io);
            let connection = HttpConnection::new(reader, writer);
            black_box(block_on(connection.process(handler.clone())).unwrap());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_session_cipher, bench_http_connection);
criterion_main!(benches);
