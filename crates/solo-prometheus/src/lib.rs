//! Prometheus backend for provisioning metrics.
//!
//! [`PrometheusMetrics`] implements [`solo_core::MetricsBackend`]; inject it through
//! [`solo_core::ProvisionContext`] and serve [`PrometheusMetrics::encode_text`] from
//! whatever HTTP surface the binary already has.
//!
//! ```rust
//! use std::sync::Arc;
//! use solo_core::ProvisionContext;
//! use solo_model::Env;
//! use solo_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let ctx = ProvisionContext::new(Env::default(), Arc::new(metrics.clone()));
//! # let _ = ctx;
//! let body = metrics.encode_text()?;
//! assert!(body.is_empty() || body.contains("solo_"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `solo_admissions_total{outcome}`
//! - `solo_provisions_started_total`
//! - `solo_provisions_completed_total{outcome}`
//! - `solo_provision_duration_seconds{outcome}`
//! - `solo_provision_errors_total{kind}`
//! - `solo_teardowns_total{reason}`

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
