use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

pub mod admin;
pub mod config;
pub mod error;
pub mod forward;
pub mod health;
pub mod pool;
pub mod server;
pub mod util;

pub type Result<T> = std::result::Result<T, error::ProxyError>;

/// Body type every handler returns. Streamed upstream bodies and locally
/// built ones are both boxed into it.
pub type ProxyBody = BoxBody<Bytes, error::ProxyError>;

/// Outbound HTTP client, shared between the forwarder and the health probe
/// so upstream connections are pooled in one place.
pub type HttpClient = Client<HttpConnector, ProxyBody>;

pub fn new_http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}
