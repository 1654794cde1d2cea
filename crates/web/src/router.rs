//! Method and path based request routing.
//!
//! A route binds an HTTP method and a path pattern to a handler. Patterns
//! are slash-delimited; a segment starting with `:` is a named parameter
//! capturing exactly one non-empty URL segment. There is no multi-segment
//! wildcard and no normalization: trailing slashes are significant and
//! literal segments compare byte-for-byte, case-sensitively.
//!
//! Lookup scans the table in registration order and the first match wins,
//! so specific patterns must be registered before overlapping general
//! ones. The scan is O(routes x segments) per lookup, fine for the small
//! tables this crate targets; a prefix tree is the upgrade path for big
//! ones.

use crate::handler::RequestHandler;
use crate::request::PathParams;

use http::Method;

/// A single registered route. Immutable once registered.
pub struct Route {
    method: Method,
    pattern: String,
    handler: Box<dyn RequestHandler>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// An ordered, append-only route table.
///
/// Registration happens once, before serving starts; after that the table
/// is read-only, so concurrent lookups from connection tasks need no
/// locking.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resolves a handler for the given method and path, extracting the
    /// pattern's named captures.
    ///
    /// Returns `None` when nothing matches; the caller decides what a miss
    /// means (the server maps it to a 404 response).
    pub fn find<'router, 'req>(
        &'router self,
        method: &Method,
        path: &'req str,
    ) -> Option<(&'router dyn RequestHandler, PathParams<'router, 'req>)> {
        self.routes
            .iter()
            .find(|route| route.method == *method && match_path(&route.pattern, path))
            .map(|route| (route.handler.as_ref(), capture_params(&route.pattern, path)))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Reports whether `pattern` matches `path`.
///
/// Both are split on `/`; the segment sequences must have equal length,
/// every literal segment must equal its counterpart exactly, and every
/// `:name` segment matches any single non-empty path segment.
pub fn match_path(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(pattern_segment), Some(path_segment)) => {
                if pattern_segment.starts_with(':') {
                    if path_segment.is_empty() {
                        return false;
                    }
                } else if pattern_segment != path_segment {
                    return false;
                }
            }
            // unequal segment counts, including the trailing-slash case
            _ => return false,
        }
    }
}

/// Extracts the captured value of every `:name` segment.
///
/// Must only be called after `match_path` succeeded. A pattern declaring
/// the same name twice keeps the later capture.
fn capture_params<'router, 'req>(pattern: &'router str, path: &'req str) -> PathParams<'router, 'req> {
    let mut params: Vec<(&'router str, &'req str)> = Vec::new();

    for (pattern_segment, path_segment) in pattern.split('/').zip(path.split('/')) {
        if let Some(name) = pattern_segment.strip_prefix(':') {
            match params.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = path_segment,
                None => params.push((name, path_segment)),
            }
        }
    }

    PathParams::new(params)
}

/// A method + handler pair awaiting its pattern, produced by [`get`],
/// [`post`] and friends.
pub struct RouteEntry {
    method: Method,
    handler: Box<dyn RequestHandler>,
}

macro_rules! method_route_entry {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Binds a handler to the ", stringify!($method), " method.")]
        pub fn $name<H: RequestHandler + 'static>(handler: H) -> RouteEntry {
            RouteEntry { method: Method::$method, handler: Box::new(handler) }
        }
    };
}

method_route_entry!(get, GET);
method_route_entry!(head, HEAD);
method_route_entry!(post, POST);
method_route_entry!(put, PUT);
method_route_entry!(delete, DELETE);

/// Collects routes in registration order, then builds the immutable table.
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Appends a route. Registration order is significant: on lookup the
    /// first matching route wins.
    pub fn route(mut self, pattern: impl Into<String>, entry: RouteEntry) -> Self {
        self.routes.push(Route { method: entry.method, pattern: pattern.into(), handler: entry.handler });
        self
    }

    pub fn build(self) -> Router {
        Router { routes: self.routes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::ResponseBody;
    use crate::request::RequestContext;
    use crate::handler_fn;
    use bytes::Bytes;
    use http::{Request, Response};
    use http_body_util::BodyExt;
    use wisp_http::protocol::RequestHeader;

    fn static_handler(text: &'static str) -> impl RequestHandler {
        handler_fn(move |_ctx: RequestContext| async move { Response::new(ResponseBody::from(text)) })
    }

    async fn invoke_found(router: &Router, method: Method, path: &str) -> String {
        let (handler, params) = router.find(&method, path).expect("route must match");

        let header: RequestHeader =
            Request::builder().method(method.clone()).uri(path).body(()).unwrap().into();
        let ctx = RequestContext::new(header, &params, Bytes::new());

        let body = handler.invoke(ctx).await.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn match_path_literal_and_param_table() {
        assert!(match_path("/users/:id", "/users/123"));
        assert!(!match_path("/users/:id", "/users/123/extra"));
        assert!(match_path("/users/", "/users/"));
        assert!(!match_path("/users", "/users/"));
        assert!(!match_path("/users/", "/users"));

        assert!(match_path("/", "/"));
        assert!(!match_path("/users/:id", "/users/"));
        assert!(!match_path("/Users", "/users"));
        assert!(!match_path("/users/:id", "/customers/123"));
    }

    #[test]
    fn capture_extracts_named_segments() {
        assert!(match_path("/users/:userId/posts/:postId", "/users/456/posts/789"));

        let params = capture_params("/users/:userId/posts/:postId", "/users/456/posts/789");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("userId"), Some("456"));
        assert_eq!(params.get("postId"), Some("789"));
    }

    #[test]
    fn duplicate_param_name_keeps_later_capture() {
        let params = capture_params("/a/:x/b/:x", "/a/1/b/2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("x"), Some("2"));
    }

    #[tokio::test]
    async fn first_registered_route_wins() {
        let router = Router::builder()
            .route("/users", get(static_handler("H1")))
            .route("/users", get(static_handler("H2")))
            .build();

        assert_eq!(invoke_found(&router, Method::GET, "/users").await, "H1");
    }

    #[tokio::test]
    async fn methods_do_not_cross_match() {
        let router = Router::builder()
            .route("/users", get(static_handler("from get")))
            .route("/users", post(static_handler("from post")))
            .build();

        assert_eq!(invoke_found(&router, Method::GET, "/users").await, "from get");
        assert_eq!(invoke_found(&router, Method::POST, "/users").await, "from post");

        assert!(router.find(&Method::PUT, "/users").is_none());
        assert!(router.find(&Method::DELETE, "/users").is_none());
    }

    #[test]
    fn no_match_is_none_not_an_error() {
        let router = Router::builder().route("/known", get(static_handler("known"))).build();

        assert!(router.find(&Method::GET, "/unknown").is_none());
    }

    #[tokio::test]
    async fn parameterized_route_resolves_with_captures() {
        let router = Router::builder()
            .route("/users/:id", get(handler_fn(|ctx: RequestContext| async move {
                let id = ctx.param("id").unwrap_or("none").to_owned();
                Response::new(ResponseBody::from(id))
            })))
            .build();

        assert_eq!(invoke_found(&router, Method::GET, "/users/42").await, "42");
    }
}
