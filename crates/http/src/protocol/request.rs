//! HTTP request header handling implementation.
//!
//! This module provides the core abstractions for handling HTTP request headers.
//! It wraps the standard `http::Request` type to provide additional functionality
//! specific to our HTTP server implementation.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - Conversion from different request formats
/// - Body attachment capabilities
/// - Connection persistence inspection
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    ///
    /// This is typically used after header parsing to attach the parsed body.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Reports whether the connection may be reused for a subsequent request.
    ///
    /// HTTP/1.1 connections are persistent unless the request carries
    /// `Connection: close`; HTTP/1.0 connections close unless the request
    /// carries `Connection: keep-alive`. The header value token is compared
    /// case-insensitively.
    pub fn keep_alive(&self) -> bool {
        let connection = self
            .headers()
            .get(http::header::CONNECTION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim);

        match self.version() {
            Version::HTTP_11 => !connection.is_some_and(|v| v.eq_ignore_ascii_case("close")),
            Version::HTTP_10 => connection.is_some_and(|v| v.eq_ignore_ascii_case("keep-alive")),
            _ => false,
        }
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
