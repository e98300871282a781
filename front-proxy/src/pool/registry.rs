use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::ProxyConfig;

use super::backend::{Backend, BackendLimits, NORMAL_WEIGHT, SLOW_WEIGHT};

pub(crate) struct RegistryInner {
    /// registration order doubles as selector iteration order
    pub(crate) backends: Vec<Arc<Backend>>,
    pub(crate) cursor: usize,
    pub(crate) weight_tier: u32,
    pub(crate) total_hit: u64,
    pub(crate) total_avg_latency_ms: f64,
}

/// The ordered pool of registered backends plus the selector and global
/// latency state. This mutex is the selector lock: it is taken before any
/// backend lock and never held across upstream I/O.
pub struct Registry {
    /// clock origin; deadlines are carried as ms since this instant
    origin: Instant,
    limits: BackendLimits,
    pub(crate) normal_weight: u32,
    pub(crate) slow_weight: u32,
    pub(crate) expected_latency_ms: u64,
    pub(crate) inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new(cfg: &ProxyConfig) -> Self {
        // weighted = false collapses both classes into one tier
        let normal_weight = if cfg.weighted { NORMAL_WEIGHT } else { SLOW_WEIGHT };
        Registry {
            origin: Instant::now(),
            limits: BackendLimits {
                request_error_threshold: cfg.request_error_threshold,
                healthcheck_error_threshold: cfg.healthcheck_error_threshold,
                slow_request_threshold: cfg.slow_request_threshold,
                recover_cooldown_ms: cfg.recover_cooldown_ms,
            },
            normal_weight,
            slow_weight: SLOW_WEIGHT,
            expected_latency_ms: cfg.expected_latency_ms,
            inner: Mutex::new(RegistryInner {
                backends: Vec::new(),
                cursor: 0,
                weight_tier: normal_weight,
                total_hit: 0,
                total_avg_latency_ms: 0.0,
            }),
        }
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Append-or-revive. A known URL is put back in rotation with its
    /// counters intact; a new one joins at the end of the rotation.
    pub fn register(&self, url: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.backends.iter().find(|b| b.url() == url) {
            existing.revive();
            return;
        }
        inner.backends.push(Arc::new(Backend::new(
            url.to_string(),
            self.limits,
            self.normal_weight,
        )));
    }

    /// Stable view of the pool for the probe fan-out and the stats page.
    pub fn snapshot(&self) -> Vec<Arc<Backend>> {
        self.inner.lock().unwrap().backends.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_hit(&self) -> u64 {
        self.inner.lock().unwrap().total_hit
    }

    /// Replace every backend with a fresh default record keyed by the same
    /// URL, keeping registration order. Totals and the weight tier start
    /// over; the cursor deliberately survives.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.backends = inner
            .backends
            .iter()
            .map(|b| Arc::new(Backend::new(b.url().to_string(), self.limits, self.normal_weight)))
            .collect();
        inner.weight_tier = self.normal_weight;
        inner.total_hit = 0;
        inner.total_avg_latency_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BackendStatus;

    fn registry() -> Registry {
        Registry::new(&ProxyConfig::default())
    }

    #[test]
    fn test_register_keeps_insertion_order() {
        let reg = registry();
        reg.register("http://localhost:8081");
        reg.register("http://localhost:8082");
        reg.register("http://localhost:8083");
        let urls: Vec<_> = reg.snapshot().iter().map(|b| b.url().to_string()).collect();
        assert_eq!(
            urls,
            ["http://localhost:8081", "http://localhost:8082", "http://localhost:8083"]
        );
    }

    #[test]
    fn test_register_existing_revives_without_counter_reset() {
        let reg = registry();
        reg.register("http://localhost:8081");
        let backend = reg.snapshot()[0].clone();
        backend.record_hit();
        backend.record_hit();
        backend.on_healthcheck_error();
        backend.on_healthcheck_error();
        assert_eq!(backend.status(), BackendStatus::Down);

        reg.register("http://localhost:8081");
        assert_eq!(reg.len(), 1);
        assert_eq!(backend.status(), BackendStatus::Healthy);
        assert_eq!(backend.hit_count(), 2);
    }

    #[test]
    fn test_reset_recreates_backends_and_clears_totals() {
        let reg = registry();
        reg.register("http://localhost:8081");
        reg.register("http://localhost:8082");
        let doomed = reg.snapshot()[1].clone();
        doomed.on_request_error(reg.now_ms());
        doomed.on_request_error(reg.now_ms());
        for _ in 0..4 {
            reg.select_backend();
        }
        assert!(reg.total_hit() > 0);

        reg.reset();

        assert_eq!(reg.total_hit(), 0);
        let backends = reg.snapshot();
        let urls: Vec<_> = backends.iter().map(|b| b.url().to_string()).collect();
        assert_eq!(urls, ["http://localhost:8081", "http://localhost:8082"]);
        for b in &backends {
            assert_eq!(b.status(), BackendStatus::Healthy);
            assert_eq!(b.hit_count(), 0);
        }
    }
}
