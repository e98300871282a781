use std::sync::Mutex;

use serde::Serialize;

pub const NORMAL_WEIGHT: u32 = 2;
pub const SLOW_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackendStatus {
    /// serving traffic normally
    Healthy,
    /// tripped the request error threshold, sits out until its cooldown ends
    Unhealthy,
    /// tripped the probe error threshold, only a probe success readmits it
    Down,
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendStatus::Healthy => write!(f, "HEALTHY"),
            BackendStatus::Unhealthy => write!(f, "UNHEALTHY"),
            BackendStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Per-instance tunables, frozen at creation time.
#[derive(Debug, Clone, Copy)]
pub struct BackendLimits {
    pub request_error_threshold: u32,
    pub healthcheck_error_threshold: u32,
    pub slow_request_threshold: u32,
    pub recover_cooldown_ms: u64,
}

#[derive(Debug)]
pub(crate) struct BackendRecord {
    pub(crate) status: BackendStatus,
    pub(crate) hit_count: u64,
    pub(crate) request_error_count: u32,
    pub(crate) healthcheck_error_count: u32,
    pub(crate) slow_request_count: u32,
    /// cooldown deadline in registry-clock ms, 0 = never demoted
    pub(crate) recover_at_ms: u64,
    pub(crate) avg_latency_ms: f64,
    pub(crate) weight: u32,
}

/// One registered backend instance. The URL and thresholds never change;
/// everything else mutates under the record mutex, one acquisition per
/// outcome so counters and status always move together.
pub struct Backend {
    url: String,
    limits: BackendLimits,
    pub(crate) record: Mutex<BackendRecord>,
}

impl Backend {
    pub fn new(url: String, limits: BackendLimits, weight: u32) -> Self {
        Backend {
            url,
            limits,
            record: Mutex::new(BackendRecord {
                status: BackendStatus::Healthy,
                hit_count: 0,
                request_error_count: 0,
                healthcheck_error_count: 0,
                slow_request_count: 0,
                recover_at_ms: 0,
                avg_latency_ms: 0.0,
                weight,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> BackendStatus {
        self.record.lock().unwrap().status
    }

    pub fn hit_count(&self) -> u64 {
        self.record.lock().unwrap().hit_count
    }

    pub fn weight(&self) -> u32 {
        self.record.lock().unwrap().weight
    }

    /// A served request came back fine.
    pub fn on_request_success(&self) {
        let mut rec = self.record.lock().unwrap();
        rec.request_error_count = 0;
        rec.status = BackendStatus::Healthy;
    }

    /// A served request failed at the transport level, timed out, or came
    /// back 5xx. At the threshold the backend leaves rotation until
    /// `now + cooldown`.
    pub fn on_request_error(&self, now_ms: u64) {
        let mut rec = self.record.lock().unwrap();
        rec.request_error_count += 1;
        if rec.request_error_count >= self.limits.request_error_threshold {
            rec.status = BackendStatus::Unhealthy;
            rec.recover_at_ms = now_ms + self.limits.recover_cooldown_ms;
        }
    }

    /// A liveness probe succeeded. Rescues DOWN only; an UNHEALTHY backend
    /// has to wait out its cooldown and prove itself on live traffic.
    pub fn on_healthcheck_success(&self) {
        let mut rec = self.record.lock().unwrap();
        if rec.status == BackendStatus::Down {
            rec.status = BackendStatus::Healthy;
            rec.healthcheck_error_count = 0;
        }
    }

    /// A liveness probe failed. At the threshold the backend is parked until
    /// a probe succeeds again.
    pub fn on_healthcheck_error(&self) {
        let mut rec = self.record.lock().unwrap();
        rec.healthcheck_error_count += 1;
        if rec.healthcheck_error_count >= self.limits.healthcheck_error_threshold {
            rec.status = BackendStatus::Down;
        }
    }

    /// Re-registration keeps counters but puts the backend back in rotation.
    pub(crate) fn revive(&self) {
        self.record.lock().unwrap().status = BackendStatus::Healthy;
    }

    pub(crate) fn record_hit(&self) {
        self.record.lock().unwrap().hit_count += 1;
    }

    /// Selector eligibility for the current weight tier.
    pub(crate) fn eligible(&self, now_ms: u64, weight_tier: u32) -> bool {
        let rec = self.record.lock().unwrap();
        if rec.status == BackendStatus::Down {
            return false;
        }
        if rec.status == BackendStatus::Unhealthy && now_ms < rec.recover_at_ms {
            return false;
        }
        rec.weight >= weight_tier
    }

    /// Fold one latency sample into the running mean and apply the slow
    /// policy: any fast sample rehabilitates outright, slow samples
    /// accumulate until the weight drops.
    pub(crate) fn observe_latency(&self, sample_ms: f64, fast: bool, normal_weight: u32, slow_weight: u32) {
        let mut rec = self.record.lock().unwrap();
        rec.avg_latency_ms = super::latency::running_mean(rec.avg_latency_ms, rec.hit_count, sample_ms);
        if fast {
            rec.slow_request_count = 0;
            rec.weight = normal_weight;
            return;
        }
        rec.slow_request_count += 1;
        if rec.slow_request_count > self.limits.slow_request_threshold {
            rec.weight = slow_weight;
        }
    }
}
