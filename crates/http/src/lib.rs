//! An embeddable asynchronous HTTP/1.1 server core
//!
//! This crate provides a lightweight HTTP/1.1 server core built on top of
//! tokio, meant for embedding into applications that need a plain HTTP
//! endpoint without a full web framework. It covers connection acceptance
//! plumbing, incremental request parsing, and per-connection lifecycle
//! management; routing and higher-level ergonomics live in the companion
//! `wisp-web` crate.
//!
//! # Features
//!
//! - HTTP/1.1 and HTTP/1.0 request parsing, incremental and restartable
//! - Keep-alive connections with correct body draining between requests
//! - Content-Length framed request and response bodies
//! - Optional per-connection read and write timeouts
//! - Process-wide active-connection accounting
//! - Clean error taxonomy: malformed input, truncated requests and I/O
//!   failures are told apart and isolated per connection
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use wisp_http::connection::{ConnectionGuard, HttpConnection};
//! use wisp_http::handler::make_handler;
//! use http_body_util::Full;
//!
//! #[tokio::main]
//! async fn main() {
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!
//!         tokio::spawn(async move {
//!             let _guard = ConnectionGuard::new();
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             match connection.process(handler).await {
//!                 Ok(()) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     info!(path = request.uri().path(), "incoming request");
//!
//!     let response_body = "Hello World!\r\n";
//!     let response = Response::builder()
//!         .status(StatusCode::OK)
//!         .body(Full::new(Bytes::from(response_body)))
//!         .unwrap();
//!
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`connection`]: Core connection handling and lifecycle management
//! - [`protocol`]: Protocol types and abstractions
//! - [`codec`]: Protocol encoding/decoding implementation
//! - [`handler`]: Request handler traits and utilities
//!
//! # Limitations
//!
//! - HTTP/1.1 only (no HTTP/2 or HTTP/3)
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Chunked transfer encoding on requests is rejected
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
