use super::backend::Backend;
use super::registry::Registry;

/// Incremental running mean: `new = (old * (k - 1) + x) / k` where `k` is
/// the hit count including the sample being folded in. `k = 0` can only
/// happen when a reset races an in-flight request; the sample then simply
/// becomes the mean.
pub(crate) fn running_mean(prev: f64, k: u64, sample: f64) -> f64 {
    let k = k.max(1) as f64;
    (prev * (k - 1.0) + sample) / k
}

impl Registry {
    /// Feed one observed request latency into the global and per-backend
    /// means, then apply the slow policy to the backend that served it.
    /// Samples are whole milliseconds; anything above the expected latency
    /// counts as slow.
    pub fn observe_latency(&self, backend: &Backend, elapsed_ms: u64) {
        let sample = elapsed_ms as f64;
        {
            let mut inner = self.inner.lock().unwrap();
            let k = inner.total_hit;
            inner.total_avg_latency_ms = running_mean(inner.total_avg_latency_ms, k, sample);
        }
        backend.observe_latency(
            sample,
            elapsed_ms <= self.expected_latency_ms,
            self.normal_weight,
            self.slow_weight,
        );
    }
}
