use std::sync::Arc;
use std::time::Duration;

use http::{Request, StatusCode};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::pool::{Backend, Registry};
use crate::util;
use crate::HttpClient;

/// Spawn the periodic liveness probe.
///
/// Each tick snapshots the pool and fires one independent probe task per
/// backend, so a stuck backend never delays its peers or the next tick.
pub fn spawn_probe(
    registry: Arc<Registry>,
    client: HttpClient,
    cfg: &ProxyConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = Duration::from_millis(cfg.probe_interval_ms);
    let deadline = Duration::from_millis(cfg.probe_timeout_ms);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for backend in registry.snapshot() {
                        tokio::spawn(probe_backend(client.clone(), backend, deadline));
                    }
                }
                changed = shutdown.changed() => {
                    // a closed channel means the instance is gone
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("health probe stopping");
                        break;
                    }
                }
            }
        }
    });
}

/// One probe: `GET {url}/healthcheck`, success iff the transport succeeds
/// and the status is 200 within the deadline.
async fn probe_backend(client: HttpClient, backend: Arc<Backend>, deadline: Duration) {
    let uri = format!("{}/healthcheck", backend.url());
    let req = match Request::get(uri.as_str()).body(util::empty_body()) {
        Ok(req) => req,
        Err(err) => {
            warn!("unprobeable backend url {}: {}", uri, err);
            backend.on_healthcheck_error();
            return;
        }
    };

    match tokio::time::timeout(deadline, client.request(req)).await {
        Ok(Ok(resp)) if resp.status() == StatusCode::OK => {
            backend.on_healthcheck_success();
        }
        Ok(Ok(resp)) => {
            warn!("healthcheck for {} returned {}", backend.url(), resp.status());
            backend.on_healthcheck_error();
        }
        Ok(Err(err)) => {
            warn!("healthcheck for {} failed: {}", backend.url(), err);
            backend.on_healthcheck_error();
        }
        Err(_) => {
            warn!("healthcheck for {} timed out", backend.url());
            backend.on_healthcheck_error();
        }
    }
}
