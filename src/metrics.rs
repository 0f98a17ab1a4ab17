//! Prometheus metrics for the gateway pipeline.
//!
//! ## Usage
//!
//! Call [`init_metrics`] once at process startup **before** handling any
//! requests. The helper functions (`record_step_latency`, `inc_step`, …) are
//! no-ops if `init_metrics` was never called, so the pipeline is always safe
//! to run — observability simply degrades gracefully.
//!
//! ## Metrics Exposed
//!
//! | Name | Type | Labels |
//! |------|------|--------|
//! | `gateway_requests_total` | Counter | `step` |
//! | `gateway_pii_findings_total` | Counter | `category` |
//! | `gateway_redactions_total` | Counter | `mode` |
//! | `gateway_cost_warnings_total` | Counter | — |
//! | `gateway_step_duration_seconds` | Histogram | `step` |
//! | `gateway_session_savings_usd` | Gauge | — |

use crate::GatewayError;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

// ── Internal metrics bundle ────────────────────────────────────────────────

/// All Prometheus metrics for the gateway, bundled together so they can
/// be stored in a single [`OnceLock`] and initialised atomically.
pub struct Metrics {
    /// Prometheus registry that owns all metric descriptors.
    pub registry: Registry,
    /// Total requests processed per pipeline step.
    pub requests_total: CounterVec,
    /// PII findings by entity category.
    pub pii_findings_total: CounterVec,
    /// Redacted requests by compliance mode.
    pub redactions_total: CounterVec,
    /// Requests whose chosen-tier cost exceeded the warn line.
    pub cost_warnings_total: IntCounter,
    /// Step processing latency histogram.
    pub step_duration: HistogramVec,
    /// Current session savings total in USD.
    pub session_savings_usd: Gauge,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

// ── Initialisation ─────────────────────────────────────────────────────────

/// Initialise all Prometheus metrics and register them with a private registry.
///
/// Must be called once at process startup before any request is handled.
/// Calling it a second time is a no-op (returns `Ok(())`).
///
/// # Errors
///
/// Returns [`GatewayError::Other`] if metric construction or registry
/// registration fails (e.g., duplicate descriptor names).
///
/// # Panics
///
/// This function never panics.
pub fn init_metrics() -> Result<(), GatewayError> {
    if METRICS.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let requests_total = CounterVec::new(
        Opts::new("gateway_requests_total", "Total requests processed"),
        &["step"],
    )
    .map_err(|e| GatewayError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(requests_total.clone()))
        .map_err(|e| GatewayError::Other(format!("metrics registration failed: {e}")))?;

    let pii_findings_total = CounterVec::new(
        Opts::new("gateway_pii_findings_total", "PII findings by category"),
        &["category"],
    )
    .map_err(|e| GatewayError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(pii_findings_total.clone()))
        .map_err(|e| GatewayError::Other(format!("metrics registration failed: {e}")))?;

    let redactions_total = CounterVec::new(
        Opts::new("gateway_redactions_total", "Redacted requests by mode"),
        &["mode"],
    )
    .map_err(|e| GatewayError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(redactions_total.clone()))
        .map_err(|e| GatewayError::Other(format!("metrics registration failed: {e}")))?;

    let cost_warnings_total = IntCounter::new(
        "gateway_cost_warnings_total",
        "Requests whose chosen-tier cost exceeded warn_cost_usd",
    )
    .map_err(|e| GatewayError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(cost_warnings_total.clone()))
        .map_err(|e| GatewayError::Other(format!("metrics registration failed: {e}")))?;

    let step_duration = HistogramVec::new(
        HistogramOpts::new(
            "gateway_step_duration_seconds",
            "Processing duration per pipeline step",
        ),
        &["step"],
    )
    .map_err(|e| GatewayError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(step_duration.clone()))
        .map_err(|e| GatewayError::Other(format!("metrics registration failed: {e}")))?;

    let session_savings_usd = Gauge::new(
        "gateway_session_savings_usd",
        "Running session savings total in USD",
    )
    .map_err(|e| GatewayError::Other(format!("metrics init failed: {e}")))?;
    registry
        .register(Box::new(session_savings_usd.clone()))
        .map_err(|e| GatewayError::Other(format!("metrics registration failed: {e}")))?;

    // If another thread raced us, the first one wins — both initializations
    // produce identical metric descriptors, so neither outcome is incorrect.
    let _ = METRICS.set(Metrics {
        registry,
        requests_total,
        pii_findings_total,
        redactions_total,
        cost_warnings_total,
        step_duration,
        session_savings_usd,
    });

    Ok(())
}

/// Return a reference to the initialised [`Metrics`], or `None` if
/// [`init_metrics`] has not been called yet.
fn metrics() -> Option<&'static Metrics> {
    METRICS.get()
}

// ── Public helper functions ────────────────────────────────────────────────

/// Record the processing latency for a pipeline step.
///
/// No-op if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn record_step_latency(step: &str, d: Duration) {
    if let Some(m) = metrics() {
        if let Ok(h) = m.step_duration.get_metric_with_label_values(&[step]) {
            h.observe(d.as_secs_f64());
        }
    }
}

/// Increment the request counter for a pipeline step.
///
/// No-op if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn inc_step(step: &str) {
    if let Some(m) = metrics() {
        if let Ok(c) = m.requests_total.get_metric_with_label_values(&[step]) {
            c.inc();
        }
    }
}

/// Add `count` findings to the PII counter for an entity category.
///
/// No-op if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn add_pii_findings(category: &str, count: u64) {
    if let Some(m) = metrics() {
        if let Ok(c) = m
            .pii_findings_total
            .get_metric_with_label_values(&[category])
        {
            c.inc_by(count as f64);
        }
    }
}

/// Increment the redaction counter for a compliance mode.
///
/// No-op if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn inc_redaction(mode: &str) {
    if let Some(m) = metrics() {
        if let Ok(c) = m.redactions_total.get_metric_with_label_values(&[mode]) {
            c.inc();
        }
    }
}

/// Increment the warn-cost counter.
///
/// No-op if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn inc_cost_warning() {
    if let Some(m) = metrics() {
        m.cost_warnings_total.inc();
    }
}

/// Set the session savings gauge.
///
/// No-op if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn set_session_savings(usd: f64) {
    if let Some(m) = metrics() {
        m.session_savings_usd.set(usd);
    }
}

/// Gather all registered metrics as a raw list of metric families.
///
/// Returns an empty `Vec` if metrics have not been initialised.
///
/// # Panics
///
/// This function never panics.
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    metrics().map_or_else(Vec::new, |m| m.registry.gather())
}

/// Gather and encode all metrics in the Prometheus text exposition format.
///
/// Returns an empty string if metrics have not been initialised or if
/// encoding fails. Observability degrades gracefully rather than panicking.
///
/// # Panics
///
/// This function never panics.
pub fn gather_metrics() -> String {
    let families = gather();
    if families.is_empty() {
        return String::new();
    }
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a fresh, isolated [`Metrics`] bundle backed by its own registry.
    ///
    /// We cannot reset the global `METRICS` OnceLock between tests, so tests
    /// that need to verify exact counter values build a local bundle instead.
    fn make_test_metrics() -> Metrics {
        let registry = Registry::new();

        let requests_total = CounterVec::new(Opts::new("t_requests_total", "test"), &["step"])
            .expect("CounterVec construction must succeed in tests");
        registry
            .register(Box::new(requests_total.clone()))
            .expect("register must succeed in tests");

        let pii_findings_total =
            CounterVec::new(Opts::new("t_pii_findings_total", "test"), &["category"])
                .expect("CounterVec construction must succeed in tests");
        registry
            .register(Box::new(pii_findings_total.clone()))
            .expect("register must succeed in tests");

        let redactions_total = CounterVec::new(Opts::new("t_redactions_total", "test"), &["mode"])
            .expect("CounterVec construction must succeed in tests");
        registry
            .register(Box::new(redactions_total.clone()))
            .expect("register must succeed in tests");

        let cost_warnings_total = IntCounter::new("t_cost_warnings_total", "test")
            .expect("IntCounter construction must succeed in tests");
        registry
            .register(Box::new(cost_warnings_total.clone()))
            .expect("register must succeed in tests");

        let step_duration =
            HistogramVec::new(HistogramOpts::new("t_step_duration_seconds", "test"), &["step"])
                .expect("HistogramVec construction must succeed in tests");
        registry
            .register(Box::new(step_duration.clone()))
            .expect("register must succeed in tests");

        let session_savings_usd = Gauge::new("t_session_savings_usd", "test")
            .expect("Gauge construction must succeed in tests");
        registry
            .register(Box::new(session_savings_usd.clone()))
            .expect("register must succeed in tests");

        Metrics {
            registry,
            requests_total,
            pii_findings_total,
            redactions_total,
            cost_warnings_total,
            step_duration,
            session_savings_usd,
        }
    }

    #[test]
    fn test_init_metrics_succeeds_once() {
        let result = init_metrics();
        assert!(result.is_ok(), "init_metrics should succeed: {result:?}");
    }

    #[test]
    fn test_init_metrics_idempotent_second_call_is_noop() {
        let _ = init_metrics();
        let result2 = init_metrics();
        assert!(result2.is_ok(), "second call must be a no-op returning Ok");
    }

    #[test]
    fn test_helpers_before_init_do_not_panic() {
        // Cannot reset OnceLock; just verify no panic occurs.
        record_step_latency("pre-init-step", Duration::from_millis(5));
        inc_step("pre-init-step");
        add_pii_findings("phone", 2);
        inc_redaction("strict");
        inc_cost_warning();
        set_session_savings(0.5);
    }

    #[test]
    fn test_step_counter_increments_in_isolated_metrics() {
        let m = make_test_metrics();
        m.requests_total
            .get_metric_with_label_values(&["token_count"])
            .expect("label ok")
            .inc();
        m.requests_total
            .get_metric_with_label_values(&["token_count"])
            .expect("label ok")
            .inc();

        let families = m.registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "t_requests_total")
            .expect("family must exist");
        let value = family.get_metric()[0].get_counter().get_value();
        assert!((value - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pii_counter_adds_by_count() {
        let m = make_test_metrics();
        m.pii_findings_total
            .get_metric_with_label_values(&["phone"])
            .expect("label ok")
            .inc_by(3.0);

        let families = m.registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "t_pii_findings_total")
            .expect("family must exist");
        let value = family.get_metric()[0].get_counter().get_value();
        assert!((value - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_savings_gauge_holds_exact_value() {
        let m = make_test_metrics();
        m.session_savings_usd.set(0.02985);

        let families = m.registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "t_session_savings_usd")
            .expect("family must exist");
        let value = family.get_metric()[0].get_gauge().get_value();
        assert!((value - 0.02985).abs() < f64::EPSILON);
    }

    #[test]
    fn test_step_latency_records_observation() {
        let m = make_test_metrics();
        m.step_duration
            .get_metric_with_label_values(&["pii_scan"])
            .expect("label ok")
            .observe(0.001);
        let families = m.registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "t_step_duration_seconds")
            .expect("histogram family must be present");
        let count = family.get_metric()[0].get_histogram().get_sample_count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_gather_metrics_returns_valid_utf8_string() {
        let _ = init_metrics();
        let output = gather_metrics();
        assert!(std::str::from_utf8(output.as_bytes()).is_ok());
    }

    #[test]
    fn test_gather_returns_non_empty_after_observation() {
        // prometheus-rs gather() skips MetricFamily entries that have zero
        // recorded time-series, so record one value first.
        let _ = init_metrics();
        inc_step("gather-test-step");
        let families = gather();
        assert!(!families.is_empty());
    }
}
