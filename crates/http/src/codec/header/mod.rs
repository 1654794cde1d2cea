//! HTTP header processing module for encoding and decoding request and
//! response heads
//!
//! # Components
//!
//! - [`HeaderDecoder`]: incremental request-head parser
//!   - Restartable across keep-alive requests
//!   - Tolerates lines split at arbitrary chunk boundaries
//!   - Enforces header count and size limits
//!
//! - [`HeaderEncoder`]: response-head serializer
//!   - Standard HTTP/1.1 status line and header formatting
//!   - Manages the Content-Length header

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
