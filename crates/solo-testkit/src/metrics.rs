use std::collections::BTreeMap;

use parking_lot::Mutex;

use solo_core::metrics::{MetricsBackend, ProvisionOutcome};

/// Metrics backend counting every call as `"{metric}:{label}"`.
#[derive(Default)]
pub struct RecordingMetrics {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().clone()
    }

    fn bump(&self, key: String) {
        *self.counts.lock().entry(key).or_default() += 1;
    }
}

impl MetricsBackend for RecordingMetrics {
    fn record_admission(&self, outcome: &str) {
        self.bump(format!("admission:{outcome}"));
    }

    fn record_provision_started(&self) {
        self.bump("provision_started".into());
    }

    fn record_provision_completed(&self, outcome: ProvisionOutcome, _duration_ms: u64) {
        self.bump(format!("provision_completed:{}", outcome.as_label()));
    }

    fn record_provision_error(&self, error_kind: &str) {
        self.bump(format!("provision_error:{error_kind}"));
    }

    fn record_teardown(&self, reason: &str) {
        self.bump(format!("teardown:{reason}"));
    }
}
