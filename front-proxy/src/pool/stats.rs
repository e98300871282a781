use std::collections::BTreeMap;

use serde::Serialize;

use super::backend::{Backend, BackendStatus};
use super::registry::Registry;

/// Wire shape of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub total_hit_count: u64,
    pub total_avg_latency: f64,
    pub servers: BTreeMap<String, ServerStats>,
}

#[derive(Debug, Serialize)]
pub struct ServerStats {
    pub status: BackendStatus,
    pub hit_count: u64,
    pub avg_lat: f64,
    pub weight: u32,
    /// seconds left on the cooldown, 0 once it elapsed
    pub wait: f64,
}

impl Backend {
    pub(crate) fn stats_entry(&self, now_ms: u64) -> ServerStats {
        let rec = self.record.lock().unwrap();
        ServerStats {
            status: rec.status,
            hit_count: rec.hit_count,
            avg_lat: rec.avg_latency_ms,
            weight: rec.weight,
            wait: rec.recover_at_ms.saturating_sub(now_ms) as f64 / 1_000.0,
        }
    }
}

impl Registry {
    /// Snapshot for the stats page. Each backend's fields are read in one
    /// lock acquisition, so a single entry is always internally consistent;
    /// the page as a whole is not atomic across backends.
    pub fn stats(&self) -> StatsSnapshot {
        let now_ms = self.now_ms();
        let inner = self.inner.lock().unwrap();
        let mut servers = BTreeMap::new();
        for backend in &inner.backends {
            servers.insert(backend.url().to_string(), backend.stats_entry(now_ms));
        }
        StatsSnapshot {
            total_hit_count: inner.total_hit,
            total_avg_latency: inner.total_avg_latency_ms,
            servers,
        }
    }
}
