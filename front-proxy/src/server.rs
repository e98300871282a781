use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tower::{buffer::BufferLayer, limit::ConcurrencyLimitLayer, ServiceBuilder};
use tracing::{debug, info, warn};

use crate::admin::{dispatch, ProxyContext};
use crate::config::ProxyConfig;
use crate::health;
use crate::new_http_client;
use crate::pool::Registry;

pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Shutdown { tx }, rx)
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// A running proxy: listener bound, accept loop and health probe spawned.
pub struct Instance {
    addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: Shutdown,
    join: JoinHandle<crate::Result<()>>,
}

impl Instance {
    pub async fn start(cfg: ProxyConfig) -> crate::Result<Instance> {
        let addr: SocketAddr = cfg.listen_addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let registry = Arc::new(Registry::new(&cfg));
        let client = new_http_client();
        let (shutdown, rx) = Shutdown::new();

        health::spawn_probe(registry.clone(), client.clone(), &cfg, rx.clone());

        let upstream_timeout =
            (cfg.upstream_timeout_ms > 0).then(|| Duration::from_millis(cfg.upstream_timeout_ms));
        let ctx = ProxyContext {
            registry: registry.clone(),
            client,
            upstream_timeout,
        };

        info!("listening on {}", addr);
        let join = tokio::spawn(accept_loop(listener, ctx, rx));
        Ok(Instance {
            addr,
            registry,
            shutdown,
            join,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn request_shutdown(&self) {
        self.shutdown.trigger();
    }

    pub async fn join_with_deadline(self, deadline: Duration) {
        match tokio::time::timeout(deadline, self.join).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => warn!("accept loop failed: {}", err),
            Ok(Err(err)) => warn!("accept loop join failed: {}", err),
            Err(_) => warn!("shutdown deadline exceeded"),
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: ProxyContext,
    mut shutdown: watch::Receiver<bool>,
) -> crate::Result<()> {
    let graceful = GracefulShutdown::new();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let io = TokioIo::new(stream);

                let svc = tower::service_fn({
                    let ctx = ctx.clone();
                    move |req: Request<Incoming>| dispatch(req, ctx.clone())
                });
                let svc = ServiceBuilder::new()
                    .layer(ConcurrencyLimitLayer::new(512))
                    .layer(BufferLayer::new(512))
                    .service(svc);
                let svc = TowerToHyperService::new(svc);

                let conn = graceful.watch(http1::Builder::new().serve_connection(io, svc));
                tasks.spawn(async move {
                    if let Err(err) = conn.await {
                        if let Some(cause) = err.source() {
                            warn!("error serving connection: {}", cause);
                        } else {
                            warn!("error serving connection: {}", err);
                        }
                    }
                });
            }

            changed = shutdown.changed() => {
                // a closed channel means the shutdown handle is gone
                if changed.is_err() || *shutdown.borrow() {
                    debug!("shutdown requested");
                    break;
                }
            }
        }
    }
    drop(listener);

    // drain in-flight connections, then give up on stragglers
    let deadline = Duration::from_secs(10);
    let drained = tokio::time::timeout(deadline, async {
        tokio::join!(graceful.shutdown(), async {
            while let Some(res) = tasks.join_next().await {
                if let Err(err) = res {
                    debug!("connection task failed: {}", err);
                }
            }
        });
    })
    .await
    .is_ok();

    if drained {
        debug!("graceful shutdown complete");
    } else {
        debug!("shutdown deadline exceeded, aborting remaining connections");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }

    Ok(())
}
