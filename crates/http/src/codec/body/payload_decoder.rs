//! Decoder implementation for HTTP message payloads.
//!
//! This module provides a unified decoder for the two request body shapes
//! this server accepts: Content-Length framed payloads and messages with no
//! body. Chunked transfer encoding never reaches this layer, the header
//! decoder rejects it.

use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for handling HTTP message payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Handle messages with no body
    NoBody,
}

impl PayloadDecoder {
    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    ///
    /// # Arguments
    /// * `size` - The expected content length in bytes
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Returns whether this decoder handles messages with no body.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            Kind::Length(_) => false,
            Kind::NoBody => true,
        }
    }

    /// Returns whether this decoder handles fixed-length payloads.
    pub fn is_fix_length(&self) -> bool {
        match &self.kind {
            Kind::Length(_) => true,
            Kind::NoBody => false,
        }
    }

    /// True once every expected payload byte has been consumed.
    ///
    /// Used to tell a mid-body EOF apart from a clean close.
    pub fn is_complete(&self) -> bool {
        match &self.kind {
            Kind::Length(length_decoder) => length_decoder.remaining() == 0,
            Kind::NoBody => true,
        }
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => Self::fix_length(length),
            PayloadSize::Empty => Self::empty(),
        }
    }
}

/// Implementation of the Decoder trait for HTTP payloads.
///
/// Delegates to the appropriate decoder based on the payload type.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_body_yields_immediate_eof() {
        let mut decoder = PayloadDecoder::empty();
        let mut buffer = BytesMut::new();

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(item.is_eof());
        assert!(decoder.is_complete());
    }

    #[test]
    fn from_payload_size() {
        assert!(PayloadDecoder::from(PayloadSize::Empty).is_empty());
        assert!(PayloadDecoder::from(PayloadSize::Length(3)).is_fix_length());
    }

    #[test]
    fn length_decoder_completion_tracking() {
        let mut decoder = PayloadDecoder::fix_length(4);
        assert!(!decoder.is_complete());

        let mut buffer = BytesMut::from(&b"abcd"[..]);
        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(chunk.is_chunk());
        assert!(decoder.is_complete());

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }
}
