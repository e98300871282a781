use std::time::Duration;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use front_proxy::config::ProxyConfig;
use front_proxy::server::Instance;

#[tokio::main]
async fn main() -> front_proxy::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("front_proxy=debug")),
        )
        .with_target(true)
        .init();

    let cfg = match std::env::var("PROXY_CONFIG") {
        Ok(path) => {
            info!("loading config from {}", path);
            ProxyConfig::from_file(&path).await?
        }
        Err(_) => ProxyConfig::default(),
    };
    debug!("config: {:?}", cfg);

    let instance = Instance::start(cfg).await?;

    tokio::signal::ctrl_c().await?;
    debug!("received SIGINT, shutting down...");
    instance.request_shutdown();
    instance.join_with_deadline(Duration::from_secs(10)).await;

    Ok(())
}
