//! Metrics collection abstraction for the provisioning loop.
//!
//! Backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are injected via [`crate::ProvisionContext`].
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, ProvisionOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
