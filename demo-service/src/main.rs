use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::info;

use pool_core::RegisterRequest;

struct AppState {
    healthy: bool,
    forced_latency_ms: u64,
    started: Instant,
}

type SharedState = Arc<Mutex<AppState>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = std::env::args().collect::<Vec<String>>();
    assert!(args.len() == 2, "Usage: {} <port>", args[0]);
    let port = &args[1];

    let proxy_url =
        std::env::var("PROXY_URL").unwrap_or_else(|_| "http://localhost:8888".to_string());
    register(&proxy_url, &format!("http://localhost:{port}"))
        .await
        .expect("service registration failed");
    info!("registered with proxy at {proxy_url}");

    let state: SharedState = Arc::new(Mutex::new(AppState {
        healthy: true,
        forced_latency_ms: 80,
        started: Instant::now(),
    }));

    let app = Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/transaction", post(transaction))
        .route("/force-lat", put(force_lat))
        .route("/flip", get(flip))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await.unwrap();
    info!("listening on {port}");
    axum::serve(listener, app).await.unwrap();
}

async fn register(proxy_url: &str, own_url: &str) -> Result<(), reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    client
        .post(format!("{proxy_url}/register"))
        .json(&RegisterRequest::new(own_url))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn healthcheck(State(state): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    let state = state.lock().await;
    if !state.healthy {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "unhealthy" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "uptime": format!("{:?}", state.started.elapsed()) })),
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct PointTransaction {
    game: String,
    gamer_id: String,
    points: i64,
}

async fn transaction(
    State(state): State<SharedState>,
    Json(tx): Json<PointTransaction>,
) -> (StatusCode, Json<PointTransaction>) {
    let delay = state.lock().await.forced_latency_ms;
    tokio::time::sleep(Duration::from_millis(delay)).await;
    (StatusCode::OK, Json(tx))
}

#[derive(Deserialize)]
struct ForceLat {
    lat: u64,
}

async fn force_lat(State(state): State<SharedState>, Query(q): Query<ForceLat>) -> StatusCode {
    state.lock().await.forced_latency_ms = q.lat;
    StatusCode::OK
}

async fn flip(State(state): State<SharedState>) -> (StatusCode, &'static str) {
    let mut state = state.lock().await;
    state.healthy = !state.healthy;
    if state.healthy {
        (StatusCode::OK, "flipped to healthy")
    } else {
        (StatusCode::OK, "flipped to unhealthy")
    }
}
