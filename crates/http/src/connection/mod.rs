//! HTTP connection handling module
//!
//! This module provides functionality for managing HTTP connections and processing
//! HTTP requests and responses. It implements the core connection handling logic
//! for the HTTP server.
//!
//! # Components
//!
//! - [`HttpConnection`]: Main connection handler that:
//!   - Manages the lifecycle of HTTP connections
//!   - Processes incoming requests
//!   - Buffers request bodies and writes responses
//!   - Honors keep-alive connections
//!   - Applies optional read/write timeouts
//!
//! - [`ConnectionGuard`] / [`active_connection_count`]: process-wide
//!   accounting of live connections

mod counter;
mod http_connection;

pub use counter::ConnectionGuard;
pub use counter::active_connection_count;
pub use http_connection::HttpConnection;
