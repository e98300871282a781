use std::sync::Arc;
use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response};
use serde_json::json;
use tracing::{info, warn};

use pool_core::RegisterRequest;

use crate::error::ProxyError;
use crate::forward::forward;
use crate::pool::Registry;
use crate::util::full_body;
use crate::{HttpClient, ProxyBody};

/// Everything a connection handler needs, cloned per connection.
#[derive(Clone)]
pub struct ProxyContext {
    pub registry: Arc<Registry>,
    pub client: HttpClient,
    pub upstream_timeout: Option<Duration>,
}

/// Top-level route dispatch. The three admin paths shadow the wildcard
/// proxy route, so a backend exposing `/stats` is unreachable through here.
/// Route errors stay local: they become HTTP error responses, never
/// connection failures.
pub async fn dispatch(req: Request<Incoming>, ctx: ProxyContext) -> crate::Result<Response<ProxyBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match path.as_str() {
        "/register" if method == Method::POST => register(req, &ctx).await,
        "/stats" if method == Method::GET => stats(&ctx),
        "/reset" if method == Method::PUT => reset(&ctx),
        "/register" | "/stats" | "/reset" => Ok(method_not_allowed()),
        _ => forward(req, ctx.client.clone(), ctx.registry.clone(), ctx.upstream_timeout).await,
    };

    result.or_else(|err| Ok(error_response(err)))
}

async fn register(req: Request<Incoming>, ctx: &ProxyContext) -> crate::Result<Response<ProxyBody>> {
    let body = req.into_body().collect().await?.to_bytes();
    let payload: RegisterRequest = serde_json::from_slice(&body)?;
    ctx.registry.register(&payload.url);
    info!("registered backend {}", payload.url);
    Ok(empty_ok())
}

fn stats(ctx: &ProxyContext) -> crate::Result<Response<ProxyBody>> {
    let snapshot = ctx.registry.stats();
    let body = serde_json::to_vec(&snapshot)?;
    Ok(json_response(StatusCode::OK, body))
}

fn reset(ctx: &ProxyContext) -> crate::Result<Response<ProxyBody>> {
    ctx.registry.reset();
    info!("registry stats reset");
    Ok(empty_ok())
}

/// Error kinds surfaced at the proxy boundary. 408 for "nothing to route
/// to" and upstream timeouts, 500 for everything else.
fn error_response(err: ProxyError) -> Response<ProxyBody> {
    let (status, message) = match &err {
        ProxyError::NoEligibleBackend => (StatusCode::REQUEST_TIMEOUT, "No healthy server"),
        ProxyError::UpstreamTimeout => {
            (StatusCode::REQUEST_TIMEOUT, "Request to backend server timed out")
        }
        _ => {
            warn!("request failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to reach backend server")
        }
    };
    let body = serde_json::to_vec(&json!({ "message": message })).unwrap();
    json_response(status, body)
}

fn method_not_allowed() -> Response<ProxyBody> {
    let body = serde_json::to_vec(&json!({ "message": "Method Not Allowed" })).unwrap();
    json_response(StatusCode::METHOD_NOT_ALLOWED, body)
}

fn empty_ok() -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::OK)
        .body(full_body(""))
        .unwrap()
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<ProxyBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(body))
        .unwrap()
}
