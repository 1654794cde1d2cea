use crate::body::ResponseBody;
use crate::handler::RequestHandler;
use crate::request::{PathParams, RequestContext};
use crate::router::Router;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use wisp_http::connection::{ConnectionGuard, HttpConnection};
use wisp_http::handler::Handler;
use wisp_http::protocol::RequestHeader;

/// Tunables for the serving loop.
///
/// `max_connections` is admission control: accepted connections above the
/// limit wait until a slot frees up. The timeouts bound individual reads
/// and response writes on each connection; expiry tears that connection
/// down through the normal error path. `None` disables the bound.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_connections: usize,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 1024, read_timeout: None, write_timeout: None }
    }
}

pub struct ServerBuilder {
    router: Option<Router>,
    default_handler: Option<Box<dyn RequestHandler>>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, default_handler: None, address: None, config: ServerConfig::default() }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Handler invoked when no route matches. Without one, misses get an
    /// empty `404 Not Found`.
    pub fn default_handler(mut self, request_handler: impl RequestHandler + 'static) -> Self {
        self.default_handler = Some(Box::new(request_handler));
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?.map_err(|source| ServerBuildError::InvalidAddress { source })?;
        Ok(Server {
            dispatcher: RouterDispatcher { router, default_handler: self.default_handler },
            address,
            config: self.config,
        })
    }
}

pub struct Server {
    dispatcher: RouterDispatcher,
    address: Vec<SocketAddr>,
    config: ServerConfig,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("address can't be resolved: {source}")]
    InvalidAddress { source: io::Error },
}

/// Errors that end the serving loop. Per-connection failures never show up
/// here, they are logged and isolated in the connection's own task.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("bind error: {source}")]
    Bind { source: io::Error },
    #[error("accept error: {source}")]
    Accept { source: io::Error },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds and serves until an accept-level failure.
    ///
    /// Each accepted connection runs in its own detached task; a slow or
    /// failing connection never blocks the accept loop or its siblings.
    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        // an embedding application may already have installed a subscriber
        let _ = tracing::subscriber::set_global_default(subscriber);

        info!("start listening at {:?}", self.address);
        let tcp_listener = TcpListener::bind(self.address.as_slice()).await.map_err(|source| ServerError::Bind { source })?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let read_timeout = self.config.read_timeout;
        let write_timeout = self.config.write_timeout;
        let dispatcher = Arc::new(self.dispatcher);

        loop {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                // the semaphore is never closed; treat it as a shutdown signal
                return Ok(());
            };

            let (tcp_stream, remote_addr) =
                tcp_listener.accept().await.map_err(|source| ServerError::Accept { source })?;

            let dispatcher = Arc::clone(&dispatcher);

            tokio::spawn(async move {
                let _permit = permit;
                let _guard = ConnectionGuard::new();

                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::with_timeouts(reader, writer, read_timeout, write_timeout);
                match connection.process(dispatcher).await {
                    Ok(()) => {
                        info!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, "service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }
}

/// Bridges the connection layer's [`Handler`] to the router.
///
/// A routing miss is recovered locally into a response - either the
/// configured default handler or a bare 404 - so an unmatched route can
/// never take down more than the request that caused it.
struct RouterDispatcher {
    router: Router,
    default_handler: Option<Box<dyn RequestHandler>>,
}

#[async_trait]
impl Handler for RouterDispatcher {
    type RespBody = ResponseBody;
    type Error = Infallible;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<ResponseBody>, Infallible> {
        let (parts, body) = req.into_parts();
        let header = RequestHeader::from(parts);

        // owned copy: the captures below borrow the path, while the header
        // moves into the request context
        let path = header.uri().path().to_owned();

        let response = match self.router.find(header.method(), &path) {
            Some((route_handler, params)) => {
                let ctx = RequestContext::new(header, &params, body);
                route_handler.invoke(ctx).await
            }
            None => match &self.default_handler {
                Some(default_handler) => {
                    let ctx = RequestContext::new(header, &PathParams::empty(), body);
                    default_handler.invoke(ctx).await
                }
                None => not_found(),
            },
        };

        Ok(response)
    }
}

fn not_found() -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::router::get;
    use http::Method;
    use http_body_util::BodyExt;

    fn dispatcher(default_handler: bool) -> RouterDispatcher {
        let router = Router::builder()
            .route("/hello", get(handler_fn(|_ctx: RequestContext| async {
                Response::new(ResponseBody::from("hello"))
            })))
            .route("/users/:id", get(handler_fn(|ctx: RequestContext| async move {
                Response::new(ResponseBody::from(format!("user {}", ctx.param("id").unwrap_or("?"))))
            })))
            .build();

        let default_handler: Option<Box<dyn RequestHandler>> = default_handler.then(|| {
            Box::new(handler_fn(|_ctx: RequestContext| async {
                let mut response = Response::new(ResponseBody::from("custom miss"));
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            })) as Box<dyn RequestHandler>
        });

        RouterDispatcher { router, default_handler }
    }

    fn request(method: Method, path: &str) -> Request<Bytes> {
        Request::builder().method(method).uri(path).body(Bytes::new()).unwrap()
    }

    async fn body_text(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn routed_request_reaches_its_handler() {
        let dispatcher = dispatcher(false);

        let response = dispatcher.call(request(Method::GET, "/hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "hello");
    }

    #[tokio::test]
    async fn params_flow_into_the_context() {
        let dispatcher = dispatcher(false);

        let response = dispatcher.call(request(Method::GET, "/users/42")).await.unwrap();
        assert_eq!(body_text(response).await, "user 42");
    }

    #[tokio::test]
    async fn miss_becomes_a_404_response() {
        let dispatcher = dispatcher(false);

        let response = dispatcher.call(request(Method::GET, "/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn miss_prefers_the_default_handler() {
        let dispatcher = dispatcher(true);

        let response = dispatcher.call(request(Method::GET, "/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "custom miss");
    }

    #[tokio::test]
    async fn wrong_method_is_a_miss() {
        let dispatcher = dispatcher(false);

        let response = dispatcher.call(request(Method::POST, "/hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn build_without_router_fails() {
        let result = Server::builder().address("127.0.0.1:0").build();
        assert!(matches!(result, Err(ServerBuildError::MissingRouter)));
    }

    #[test]
    fn build_without_address_fails() {
        let result = Server::builder().router(Router::builder().build()).build();
        assert!(matches!(result, Err(ServerBuildError::MissingAddress)));
    }
}
