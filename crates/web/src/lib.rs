//! Routing and serving layer on top of the `wisp-http` server core.
//!
//! This crate adds the pieces an application registers against: a route
//! table with named path parameters, a handler trait for plain async
//! functions, and a server bootstrap that owns the accept loop, admission
//! control and per-connection timeouts.
//!
//! # Example
//!
//! ```no_run
//! use http::Response;
//! use wisp_web::router::get;
//! use wisp_web::{RequestContext, ResponseBody, Router, Server, handler_fn};
//!
//! async fn hello(_ctx: RequestContext) -> Response<ResponseBody> {
//!     Response::new(ResponseBody::from("hello world\r\n"))
//! }
//!
//! async fn show_user(ctx: RequestContext) -> Response<ResponseBody> {
//!     let id = ctx.param("id").unwrap_or("unknown").to_owned();
//!     Response::new(ResponseBody::from(format!("user {id}\r\n")))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder()
//!         .route("/", get(handler_fn(hello)))
//!         .route("/users/:id", get(handler_fn(show_user)))
//!         .build();
//!
//!     let server = Server::builder()
//!         .router(router)
//!         .address("127.0.0.1:8080")
//!         .build()
//!         .expect("server configuration must be complete");
//!
//!     if let Err(e) = server.start().await {
//!         eprintln!("server stopped: {e}");
//!     }
//! }
//! ```

mod body;
mod handler;
mod request;
mod server;

pub mod router;

pub use body::ResponseBody;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use request::PathParams;
pub use request::RequestContext;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerConfig;
pub use server::ServerError;
