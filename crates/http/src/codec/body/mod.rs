//! HTTP body handling module for processing request and response payloads
//!
//! This module provides functionality for decoding request bodies and
//! encoding response bodies. Only Content-Length framing is supported;
//! chunked transfer encoding is rejected by the header decoder before body
//! processing starts.
//!
//! # Components
//!
//! ## Decoders
//! - [`LengthDecoder`]: Processes fixed-length payloads
//! - [`PayloadDecoder`]: Main decoder that coordinates decoding strategies
//!
//! ## Encoders
//! - [`LengthEncoder`]: Handles fixed-length payload encoding
//! - [`PayloadEncoder`]: Main encoder that manages encoding strategies

mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
