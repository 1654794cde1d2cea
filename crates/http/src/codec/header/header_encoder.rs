//! HTTP header encoder implementation for serializing HTTP response headers
//!
//! This module provides functionality for encoding HTTP response headers into raw bytes.
//! It handles serialization of the status line and headers and manages the
//! Content-Length header according to HTTP/1.1 specification.

use crate::protocol::{PayloadSize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response headers implementing the [`Encoder`] trait.
///
/// This encoder serializes a [`ResponseHead`] and [`PayloadSize`] into raw bytes,
/// setting the Content-Length header from the payload size.
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes HTTP response headers into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - HTTP version is not supported (only HTTP/1.1 supported)
    /// - Writing to buffer fails
    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut header, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        match header.version() {
            Version::HTTP_11 => {
                write!(
                    FastWrite(dst),
                    "HTTP/1.1 {} {}\r\n",
                    header.status().as_str(),
                    header.status().canonical_reason().unwrap_or("Unknown")
                )?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        // Set the content length header from the payload size
        match payload_size {
            PayloadSize::Length(n) => match header.headers_mut().get_mut(header::CONTENT_LENGTH) {
                Some(value) => *value = n.into(),
                None => {
                    header.headers_mut().insert(header::CONTENT_LENGTH, n.into());
                }
            },
            PayloadSize::Empty => match header.headers_mut().get_mut(header::CONTENT_LENGTH) {
                Some(value) => *value = 0.into(),
                None => {
                    const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                    header.headers_mut().insert(header::CONTENT_LENGTH, ZERO_VALUE);
                }
            },
        }

        // Write all headers
        for (header_name, header_value) in header.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    /// Writes a buffer into this writer, returning how many bytes were written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    /// Flush this output stream, ensuring that all intermediately buffered contents reach their destination.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    #[test]
    fn status_line_and_content_length() {
        let head: ResponseHead = Response::builder().status(StatusCode::OK).body(()).unwrap();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Length(12)), &mut dst).unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-length: 12\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn empty_payload_gets_zero_content_length() {
        let head: ResponseHead = Response::builder().status(StatusCode::NOT_FOUND).body(()).unwrap();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Empty), &mut dst).unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
    }

    #[test]
    fn existing_content_length_is_overwritten() {
        let head: ResponseHead =
            Response::builder().status(StatusCode::OK).header(header::CONTENT_LENGTH, 999).body(()).unwrap();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Length(3)), &mut dst).unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.contains("content-length: 3\r\n"));
        assert!(!text.contains("999"));
    }
}
