use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] tokio::io::Error),

    #[error("Invalid listen address: {0}")]
    ListenAddr(#[from] std::net::AddrParseError),

    #[error("Invalid upstream uri: {0}")]
    UpstreamUri(#[from] http::uri::InvalidUri),

    #[error("Hyper http error: {0}")]
    HyperHttp(#[from] hyper::http::Error),

    #[error("Hyper error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("Hyper client error: {0}")]
    LegacyClient(#[from] hyper_util::client::legacy::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No eligible backend")]
    NoEligibleBackend,

    #[error("Upstream request timed out")]
    UpstreamTimeout,
}
