use std::sync::Arc;

use super::backend::Backend;
use super::registry::Registry;

impl Registry {
    /// Weighted round robin over the registration order.
    ///
    /// The cursor walks the pool; each wrap to index 0 drops the weight tier
    /// by one, cycling back to the normal weight below 1, so backends at the
    /// normal weight are visible on every tier while slow ones only qualify
    /// on the lowest. A candidate is skipped while DOWN, while UNHEALTHY
    /// inside its cooldown, or while its weight is under the current tier.
    ///
    /// Examining `2 * len` candidates visits every backend under both tiers;
    /// if none qualified by then, nothing can qualify this pass and the call
    /// reports no eligible backend instead of spinning.
    pub fn select_backend(&self) -> Option<Arc<Backend>> {
        let now_ms = self.now_ms();
        let mut inner = self.inner.lock().unwrap();
        let n = inner.backends.len();
        if n == 0 {
            return None;
        }

        let mut examined = 0;
        while examined < 2 * n {
            let idx = inner.cursor % n;
            if idx == 0 {
                inner.weight_tier = if inner.weight_tier <= 1 {
                    self.normal_weight
                } else {
                    inner.weight_tier - 1
                };
            }
            let candidate = inner.backends[idx].clone();
            inner.cursor = inner.cursor.wrapping_add(1);
            examined += 1;

            if candidate.eligible(now_ms, inner.weight_tier) {
                // hit accounting happens under the selector lock so the
                // global and per-backend counts can never drift apart
                candidate.record_hit();
                inner.total_hit += 1;
                return Some(candidate);
            }
        }
        None
    }
}
