use std::sync::Arc;

/// Provisioning outcome for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Worker came online.
    Online,
    /// Launch or registration failed.
    Failed,
    /// Worker never came online within the ready timeout.
    Timeout,
    /// Wait abandoned (queue item gone or shutdown).
    Canceled,
}

impl ProvisionOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ProvisionOutcome::Online => "online",
            ProvisionOutcome::Failed => "failed",
            ProvisionOutcome::Timeout => "timeout",
            ProvisionOutcome::Canceled => "canceled",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected via [`crate::ProvisionContext`] and shared by the
/// listener, the orchestrator and teardown.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record one admission decision.
    ///
    /// # Arguments
    /// - `outcome`: `provisioning`, `skipped` or `rejected`
    fn record_admission(&self, outcome: &str);
    /// Record the start of a background provisioning unit.
    fn record_provision_started(&self);
    /// Record the end of a provisioning unit with outcome and duration.
    ///
    /// # Arguments
    /// - `outcome`: How the unit finished
    /// - `duration_ms`: Time from start to outcome in milliseconds
    fn record_provision_completed(&self, outcome: ProvisionOutcome, duration_ms: u64);
    /// Record a provisioning error by kind (see `ProvisionError::kind`).
    fn record_provision_error(&self, error_kind: &str);
    /// Record a worker teardown by reason.
    fn record_teardown(&self, reason: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
