use std::sync::Arc;

use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use solo_core::{MetricsBackend, ProvisionOutcome};

const NAMESPACE: &str = "solo";

/// Prometheus metrics backend.
///
/// Label values are bounded: admission outcomes, [`ProvisionOutcome`] labels,
/// `ProvisionError` kinds and teardown reasons.
#[derive(Clone)]
pub struct PrometheusMetrics {
    admissions: CounterVec,
    provisions_started: Counter,
    provisions_completed: CounterVec,
    provision_duration: HistogramVec,
    provision_errors: CounterVec,
    teardowns: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let admissions = CounterVec::new(
            Opts::new("admissions_total", "Admission decisions by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(admissions.clone()))?;

        let provisions_started = Counter::with_opts(
            Opts::new("provisions_started_total", "Provisioning units started")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(provisions_started.clone()))?;

        let provisions_completed = CounterVec::new(
            Opts::new("provisions_completed_total", "Provisioning units finished by outcome")
                .namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(provisions_completed.clone()))?;

        // Workers take seconds to minutes to connect.
        let provision_duration = HistogramVec::new(
            HistogramOpts::new(
                "provision_duration_seconds",
                "Time from provisioning start to outcome",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(provision_duration.clone()))?;

        let provision_errors = CounterVec::new(
            Opts::new("provision_errors_total", "Provisioning errors by kind").namespace(NAMESPACE),
            &["kind"],
        )?;
        registry.register(Box::new(provision_errors.clone()))?;

        let teardowns = CounterVec::new(
            Opts::new("teardowns_total", "Worker teardowns by reason").namespace(NAMESPACE),
            &["reason"],
        )?;
        registry.register(Box::new(teardowns.clone()))?;

        Ok(Self {
            admissions,
            provisions_started,
            provisions_completed,
            provision_duration,
            provision_errors,
            teardowns,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    /// Content type matching [`Self::encode_text`].
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_admission(&self, outcome: &str) {
        self.admissions.with_label_values(&[outcome]).inc();
    }

    fn record_provision_started(&self) {
        self.provisions_started.inc();
    }

    fn record_provision_completed(&self, outcome: ProvisionOutcome, duration_ms: u64) {
        let label = outcome.as_label();
        self.provisions_completed.with_label_values(&[label]).inc();
        self.provision_duration
            .with_label_values(&[label])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_provision_error(&self, error_kind: &str) {
        self.provision_errors.with_label_values(&[error_kind]).inc();
    }

    fn record_teardown(&self, reason: &str) {
        self.teardowns.with_label_values(&[reason]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn admissions_are_split_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_admission("provisioning");
        metrics.record_admission("provisioning");
        metrics.record_admission("skipped");

        let families = metrics.gather();
        assert_eq!(family(&families, "solo_admissions_total").get_metric().len(), 2);
    }

    #[test]
    fn completion_feeds_counter_and_histogram() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_provision_started();
        metrics.record_provision_completed(ProvisionOutcome::Online, 3_000);
        metrics.record_provision_completed(ProvisionOutcome::Timeout, 300_000);

        let families = metrics.gather();
        assert_eq!(family(&families, "solo_provisions_started_total").get_metric().len(), 1);
        assert_eq!(family(&families, "solo_provisions_completed_total").get_metric().len(), 2);
        assert_eq!(family(&families, "solo_provision_duration_seconds").get_metric().len(), 2);
    }

    #[test]
    fn errors_and_teardowns_are_recorded() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_provision_error("launch_failure");
        metrics.record_teardown("retention");
        metrics.record_teardown("provision_failed");

        let families = metrics.gather();
        assert_eq!(family(&families, "solo_provision_errors_total").get_metric().len(), 1);
        assert_eq!(family(&families, "solo_teardowns_total").get_metric().len(), 2);
    }

    #[test]
    fn text_encoding_contains_series() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_teardown("shutdown");
        metrics.record_provision_started();

        let body = metrics.encode_text().unwrap();
        assert!(body.contains(r#"solo_teardowns_total{reason="shutdown"} 1"#));
        assert!(body.contains("solo_provisions_started_total 1"));
        assert!(metrics.content_type().starts_with("text/plain"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
