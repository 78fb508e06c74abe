use crate::metrics::backend::{MetricsBackend, ProvisionOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_admission(&self, _: &str) {}

    #[inline(always)]
    fn record_provision_started(&self) {}

    #[inline(always)]
    fn record_provision_completed(&self, _: ProvisionOutcome, _: u64) {}

    #[inline(always)]
    fn record_provision_error(&self, _: &str) {}

    #[inline(always)]
    fn record_teardown(&self, _: &str) {}
}
