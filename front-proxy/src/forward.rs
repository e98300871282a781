use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::{debug, warn};

use crate::error::ProxyError;
use crate::pool::Registry;
use crate::util;
use crate::{HttpClient, ProxyBody};

/// Forward one client request to a selected backend and stream the response
/// back unchanged.
///
/// Latency is recorded for every attempt, failed ones included. Transport
/// errors, timeouts and upstream 5xx count against the backend; any other
/// upstream status is a success for health purposes and passes through
/// as-is.
pub async fn forward(
    req: Request<Incoming>,
    client: HttpClient,
    registry: Arc<Registry>,
    upstream_timeout: Option<Duration>,
) -> crate::Result<Response<ProxyBody>> {
    let backend = registry.select_backend().ok_or(ProxyError::NoEligibleBackend)?;

    let (mut parts, body) = req.into_parts();
    util::strip_hop_by_hop(&mut parts.headers);
    let uri = upstream_uri(backend.url(), &parts.uri)?;
    debug!(method = %parts.method, uri = %uri, "forwarding");
    parts.uri = uri;
    let upstream_req = Request::from_parts(parts, body.map_err(ProxyError::from).boxed());

    let start = Instant::now();
    let result = match upstream_timeout {
        Some(deadline) => match tokio::time::timeout(deadline, client.request(upstream_req)).await {
            Ok(done) => done.map_err(ProxyError::from),
            Err(_) => Err(ProxyError::UpstreamTimeout),
        },
        None => client.request(upstream_req).await.map_err(ProxyError::from),
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    registry.observe_latency(&backend, elapsed_ms);

    match result {
        Ok(resp) => {
            if resp.status().is_server_error() {
                backend.on_request_error(registry.now_ms());
            } else {
                backend.on_request_success();
            }
            Ok(resp.map(|body| body.map_err(ProxyError::from).boxed()))
        }
        Err(err) => {
            backend.on_request_error(registry.now_ms());
            warn!("upstream request to {} failed: {}", backend.url(), err);
            Err(err)
        }
    }
}

/// Upstream target: backend base URL plus the original path and query.
fn upstream_uri(base: &str, original: &http::Uri) -> crate::Result<http::Uri> {
    let target = match original.query() {
        Some(query) => format!("{}{}?{}", base, original.path(), query),
        None => format!("{}{}", base, original.path()),
    };
    Ok(target.parse()?)
}
