use crate::body::ResponseBody;
use crate::request::RequestContext;
use async_trait::async_trait;
use http::Response;
use std::future::Future;

/// A routed request handler.
///
/// Handlers run synchronously with respect to their connection's processing
/// loop: the next request on the same connection is not read until the
/// handler has returned and its response has been written.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: RequestContext) -> Response<ResponseBody>;
}

/// Holder adapting a plain async fn to [`RequestHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    async fn invoke(&self, ctx: RequestContext) -> Response<ResponseBody> {
        (self.f)(ctx).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    FnHandler { f }
}
