//! HTTP request decoder module
//!
//! This module provides functionality for decoding HTTP requests using a streaming approach.
//! It handles both header parsing and payload decoding through a state machine pattern.
//!
//! # Components
//!
//! - [`RequestDecoder`]: Main decoder that coordinates header and payload parsing
//! - Header parsing: Uses [`HeaderDecoder`] for parsing request heads
//! - Payload handling: Uses [`PayloadDecoder`] for handling request bodies if any

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP requests that handles both headers and payload
///
/// The decoder operates in two phases:
/// 1. Header parsing: Decodes the request head using [`HeaderDecoder`]
/// 2. Payload parsing: If present, decodes the request body using [`PayloadDecoder`]
///
/// After the payload's EOF the decoder is back in the header phase, so one
/// instance serves every request of a keep-alive connection.
///
/// # State Machine
///
/// The decoder maintains its state through the `payload_decoder` field:
/// - `None`: Currently parsing headers
/// - `Some(PayloadDecoder)`: Currently parsing payload
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Default::default()
    }

    /// Restores the initial state for reuse, discarding any partially
    /// parsed request. Backing buffers keep their capacity.
    pub fn reset(&mut self) {
        self.header_decoder.reset();
        self.payload_decoder = None;
    }

    /// True when a request is partially parsed: head bytes consumed without
    /// an emitted head, or an emitted head whose body has not fully arrived.
    fn is_partial(&self) -> bool {
        if self.header_decoder.is_partial() {
            return true;
        }
        self.payload_decoder.as_ref().is_some_and(|payload_decoder| !payload_decoder.is_complete())
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder::new(), payload_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    /// Attempts to decode an HTTP request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded a request head
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded a payload chunk
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // parse payload if have payload_decoder
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // no need payload decoder in this request now
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        // parse request head
        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    /// Maps end-of-stream onto the protocol: a clean close when nothing of
    /// the current request has been consumed, [`ParseError::IncompleteRequest`]
    /// when the stream ends mid-head or mid-body.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if !src.is_empty() || self.is_partial() {
            return Err(ParseError::IncompleteRequest);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crlf(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_bytes())
    }

    #[test]
    fn head_then_body_then_next_head() {
        let mut decoder = RequestDecoder::new();
        let mut buf = crlf("POST /echo HTTP/1.1\nContent-Length: 4\n\nping");
        buf.extend_from_slice(&crlf("GET /after HTTP/1.1\n\n"));

        let head = decoder.decode(&mut buf).unwrap().unwrap();
        assert!(head.is_header());

        let chunk = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(&chunk.into_bytes().unwrap()[..], b"ping");

        let eof = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert!(eof.is_eof());

        // decoder is back in the header phase for the keep-alive request
        let next = decoder.decode(&mut buf).unwrap().unwrap();
        match next {
            Message::Header((header, payload_size)) => {
                assert_eq!(header.uri().path(), "/after");
                assert!(payload_size.is_empty());
            }
            Message::Payload(_) => panic!("expected a request head"),
        }
    }

    #[test]
    fn bodyless_request_emits_immediate_eof() {
        let mut decoder = RequestDecoder::new();
        let mut buf = crlf("GET / HTTP/1.1\n\n");

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_header());

        let eof = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn eof_mid_body_is_incomplete() {
        let mut decoder = RequestDecoder::new();
        let mut buf = crlf("POST /upload HTTP/1.1\nContent-Length: 10\n\nabc");

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_header());
        // partial chunk comes through
        let chunk = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(&chunk.into_bytes().unwrap()[..], b"abc");

        let err = decoder.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::IncompleteRequest));
    }

    #[test]
    fn clean_eof_between_requests() {
        let mut decoder = RequestDecoder::new();
        let mut buf = crlf("GET / HTTP/1.1\n\n");

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_header());
        assert!(decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap().is_eof());

        assert!(decoder.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn reset_discards_pending_body() {
        let mut decoder = RequestDecoder::new();
        let mut buf = crlf("PUT /big HTTP/1.1\nContent-Length: 100\n\npartial");

        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_header());
        decoder.reset();

        let mut fresh = crlf("GET /ok HTTP/1.1\n\n");
        let head = decoder.decode(&mut fresh).unwrap().unwrap();
        assert!(head.is_header());
    }
}
