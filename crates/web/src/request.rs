//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! This module contains the core types for working with HTTP requests in the web layer:
//! - [`RequestContext`]: What a routed handler receives: head, path parameters and body
//! - [`PathParams`]: URL path parameters extracted by the router

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};
use wisp_http::protocol::RequestHeader;

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in a route pattern that capture the
/// corresponding URL segment's literal value. For the pattern
/// `/users/:id`, `id` is a path parameter.
///
/// The lifetime parameters keep captures borrowed: names point into the
/// route table, values into the request path. Both are only valid for the
/// current request-processing iteration.
#[derive(Debug, Clone)]
pub struct PathParams<'router, 'req> {
    kind: PathParamsKind<'router, 'req>,
}

/// Internal enum to represent either empty parameters or actual parameters
#[derive(Debug, Clone)]
enum PathParamsKind<'router, 'req> {
    None,
    Params(Vec<(&'router str, &'req str)>),
}

impl<'router, 'req> PathParams<'router, 'req> {
    /// Creates a new PathParams instance from captured pairs.
    /// If the pairs are empty, returns an empty PathParams instance
    #[inline]
    pub(crate) fn new(params: Vec<(&'router str, &'req str)>) -> Self {
        if params.is_empty() {
            Self::empty()
        } else {
            Self { kind: PathParamsKind::Params(params) }
        }
    }

    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PathParamsKind::None => true,
            PathParamsKind::Params(params) => params.is_empty(),
        }
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&'req str> {
        match &self.kind {
            PathParamsKind::Params(params) => {
                params.iter().find(|(name, _)| *name == key.as_ref()).map(|(_, value)| *value)
            }
            PathParamsKind::None => None,
        }
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&'router str, &'req str)> + '_ {
        let params = match &self.kind {
            PathParamsKind::None => &[][..],
            PathParamsKind::Params(params) => params.as_slice(),
        };
        params.iter().copied()
    }
}

/// Represents the context of an HTTP request, providing access to the
/// request head, the captured path parameters and the buffered body.
///
/// The context owns its data: the connection has fully drained the request
/// from the stream before a handler runs, so nothing here borrows from
/// connection buffers.
#[derive(Debug)]
pub struct RequestContext {
    header: RequestHeader,
    params: Vec<(String, String)>,
    body: Bytes,
}

impl RequestContext {
    /// Creates a new RequestContext from the request head, the router's
    /// captures and the buffered body
    pub fn new(header: RequestHeader, path_params: &PathParams<'_, '_>, body: Bytes) -> Self {
        let params = path_params.iter().map(|(name, value)| (name.to_owned(), value.to_owned())).collect();
        Self { header, params, body }
    }

    /// Returns a reference to the underlying RequestHeader
    pub fn request_header(&self) -> &RequestHeader {
        &self.header
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        self.header.method()
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        self.header.uri()
    }

    /// Returns the path portion of the request URI
    pub fn path(&self) -> &str {
        self.header.uri().path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.header.version()
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        self.header.headers()
    }

    /// Gets a captured path parameter by name
    pub fn param(&self, name: impl AsRef<str>) -> Option<&str> {
        self.params.iter().find(|(param_name, _)| param_name == name.as_ref()).map(|(_, value)| value.as_str())
    }

    /// Returns the buffered request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the context and returns the request body
    pub fn into_body(self) -> Bytes {
        self.body
    }
}
