//! Metrics and structured event logging for the estimator
//!
//! Prometheus metrics live in the default registry and are registered once
//! per process; [`EstimatorMetrics`] is a cheap handle onto them.

use crate::calibration::CalibrationReport;
use crate::models::{ModelProvenance, PredictionResponse};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Encoder, Histogram,
    IntCounter, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds; predictions are CPU-bound and sub-millisecond
/// for typical series lengths
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

static GLOBAL_METRICS: OnceLock<EstimatorMetricsInner> = OnceLock::new();

struct EstimatorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    calibrations_total: IntCounter,
    calibration_errors_total: IntCounter,
    validations_total: IntCounter,
    bounds_warnings_total: IntCounter,
    model_calibrated: IntGauge,
}

impl EstimatorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "cost_estimator_prediction_latency_seconds",
                "Time spent forecasting and attributing power for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "cost_estimator_predictions_total",
                "Total number of energy predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "cost_estimator_prediction_errors_total",
                "Total number of rejected or failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            calibrations_total: register_int_counter!(
                "cost_estimator_calibrations_total",
                "Total number of successful power model calibrations"
            )
            .expect("Failed to register calibrations_total"),

            calibration_errors_total: register_int_counter!(
                "cost_estimator_calibration_errors_total",
                "Total number of rejected calibration requests"
            )
            .expect("Failed to register calibration_errors_total"),

            validations_total: register_int_counter!(
                "cost_estimator_validations_total",
                "Total number of power model validations against measurements"
            )
            .expect("Failed to register validations_total"),

            bounds_warnings_total: register_int_counter!(
                "cost_estimator_bounds_warnings_total",
                "Values clamped into their physical range during attribution"
            )
            .expect("Failed to register bounds_warnings_total"),

            model_calibrated: register_int_gauge!(
                "cost_estimator_model_calibrated",
                "1 when the active power model was fitted from measurements, 0 for defaults"
            )
            .expect("Failed to register model_calibrated"),
        }
    }
}

/// Handle onto the process-wide estimator metrics; clones share state
#[derive(Clone)]
pub struct EstimatorMetrics {
    _private: (),
}

impl Default for EstimatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EstimatorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EstimatorMetricsInner {
        GLOBAL_METRICS.get_or_init(EstimatorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Count a served prediction and any clamping it needed
    pub fn record_prediction(&self, response: &PredictionResponse) {
        let inner = self.inner();
        inner.predictions_total.inc();
        inner
            .bounds_warnings_total
            .inc_by(response.warnings.len() as u64);
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn inc_calibrations(&self) {
        self.inner().calibrations_total.inc();
    }

    pub fn inc_calibration_errors(&self) {
        self.inner().calibration_errors_total.inc();
    }

    pub fn inc_validations(&self) {
        self.inner().validations_total.inc();
    }

    pub fn set_model_provenance(&self, provenance: ModelProvenance) {
        let calibrated = matches!(provenance, ModelProvenance::Calibrated);
        self.inner().model_calibrated.set(i64::from(calibrated));
    }

    pub fn predictions_total(&self) -> u64 {
        self.inner().predictions_total.get()
    }

    /// Text exposition of the default registry
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Emits `event = "..."` records for significant estimator events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_prediction(&self, response: &PredictionResponse, latency_secs: f64) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            namespace = %response.namespace,
            pod_name = %response.pod_name,
            container_name = %response.container_name,
            horizon_minutes = response.prediction_horizon_minutes,
            predicted_cpu_cores = response.predicted_cpu_cores.0,
            predicted_power_watts = response.predicted_power_watts.0,
            ci_low = response.confidence_interval.low.0,
            ci_high = response.confidence_interval.high.0,
            attribution_share = response.attribution_share,
            model_provenance = response.model_provenance.as_str(),
            warnings = response.warnings.len(),
            latency_secs,
            "Energy prediction served"
        );
    }

    pub fn log_prediction_failed(&self, code: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            code = %code,
            error = %error,
            "Energy prediction failed"
        );
    }

    pub fn log_calibration(&self, report: &CalibrationReport) {
        info!(
            event = "model_calibrated",
            instance = %self.instance,
            container_to_node_slope = report.model.container_to_node_slope,
            node_util_to_power_slope = report.model.node_util_to_power_slope,
            container_to_node_r2 = report.container_to_node_r2,
            node_util_to_power_r2 = report.node_util_to_power_r2,
            "Power model replaced by calibrated fit"
        );
    }

    pub fn log_calibration_failed(&self, code: &str, error: &str) {
        warn!(
            event = "calibration_failed",
            instance = %self.instance,
            code = %code,
            error = %error,
            "Calibration rejected, keeping previous model"
        );
    }

    pub fn log_model_reset(&self) {
        info!(
            event = "model_reset",
            instance = %self.instance,
            "Power model reset to defaults"
        );
    }

    pub fn log_startup(&self, version: &str, listen_addr: &str) {
        info!(
            event = "estimator_started",
            instance = %self.instance,
            version = %version,
            listen_addr = %listen_addr,
            "Cost estimator started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "estimator_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Cost estimator shutting down"
        );
    }
}
