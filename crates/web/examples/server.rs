use http::{Response, StatusCode};
use std::time::Duration;
use wisp_web::router::{get, post};
use wisp_web::{RequestContext, ResponseBody, Router, Server, ServerConfig, handler_fn};

async fn index(_ctx: RequestContext) -> Response<ResponseBody> {
    Response::new(ResponseBody::from("wisp says hello\r\n"))
}

// curl -v http://127.0.0.1:8080/users/42
async fn show_user(ctx: RequestContext) -> Response<ResponseBody> {
    let id = ctx.param("id").unwrap_or("unknown").to_owned();
    Response::new(ResponseBody::from(format!("user {id}\r\n")))
}

// curl -v -d 'jane' http://127.0.0.1:8080/users
async fn create_user(ctx: RequestContext) -> Response<ResponseBody> {
    let name = String::from_utf8_lossy(ctx.body()).into_owned();
    let mut response = Response::new(ResponseBody::from(format!("created user {name}\r\n")));
    *response.status_mut() = StatusCode::CREATED;
    response
}

async fn fallback(ctx: RequestContext) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from(format!("no such page: {}\r\n", ctx.path())));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

#[tokio::main]
async fn main() {
    let router = Router::builder()
        .route("/", get(handler_fn(index)))
        .route("/users/:id", get(handler_fn(show_user)))
        .route("/users", post(handler_fn(create_user)))
        .build();

    let config = ServerConfig {
        max_connections: 256,
        read_timeout: Some(Duration::from_secs(30)),
        write_timeout: Some(Duration::from_secs(30)),
    };

    let server = Server::builder()
        .router(router)
        .address("127.0.0.1:8080")
        .default_handler(handler_fn(fallback))
        .config(config)
        .build()
        .expect("server configuration must be complete");

    if let Err(e) = server.start().await {
        eprintln!("server stopped: {e}");
    }
}
