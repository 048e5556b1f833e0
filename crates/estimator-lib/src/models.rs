//! Core data models for the energy estimator
//!
//! Quantities crossing the power-model boundary carry their unit in the type:
//! [`Cores`] for CPU usage, [`Percent`] for node utilization, [`Watts`] for power.

use crate::series::HistoricalSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CPU usage or reservation in cores
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cores(pub f64);

/// Node CPU utilization in percent (0-100)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub f64);

/// Electrical power in watts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watts(pub f64);

impl Cores {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Percent {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0.is_finite() && (0.0..=100.0).contains(&self.0)
    }
}

impl Watts {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Cores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} cores", self.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

impl fmt::Display for Watts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} W", self.0)
    }
}

/// Identifies a container; used for echo and logging only, never for computation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerRef {
    pub container_name: String,
    pub pod_name: String,
    pub namespace: String,
}

impl ContainerRef {
    pub fn new(
        container_name: impl Into<String>,
        pod_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            pod_name: pod_name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.pod_name, self.container_name)
    }
}

/// A container already scheduled on the same node, as observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiblingContainer {
    /// CPU reservation
    pub cpu_request: Cores,
    /// Measured node utilization this sibling induces
    pub cpu_util: Percent,
}

/// Everything the pipeline needs to answer a single prediction
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub target: ContainerRef,
    pub series: HistoricalSeries,
    pub container_cpu_request: Cores,
    pub node_current_util: Percent,
    pub node_idle_util: Percent,
    pub containers_on_node: Vec<SiblingContainer>,
    pub prediction_horizon_minutes: i64,
}

/// Where the active power model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvenance {
    /// Literature defaults loaded at startup
    Default,
    /// Fitted from field measurements
    Calibrated,
}

impl ModelProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvenance::Default => "default",
            ModelProvenance::Calibrated => "calibrated",
        }
    }
}

/// Ascending (low, high) bounds of predicted container power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub low: Watts,
    pub high: Watts,
}

impl ConfidenceInterval {
    /// Build an interval from two values in either order
    pub fn ordered(a: Watts, b: Watts) -> Self {
        if a.0 <= b.0 {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn width(&self) -> f64 {
        self.high.0 - self.low.0
    }
}

/// Predicted power draw for one container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub container_name: String,
    pub pod_name: String,
    pub namespace: String,
    pub predicted_power_watts: Watts,
    pub confidence_interval: ConfidenceInterval,
    pub prediction_horizon_minutes: i64,
    pub predicted_cpu_cores: Cores,
    pub predicted_node_util_percent: Percent,
    pub predicted_node_power_watts: Watts,
    pub attribution_share: f64,
    pub model_provenance: ModelProvenance,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub prediction_timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_is_ordered() {
        let ci = ConfidenceInterval::ordered(Watts(40.0), Watts(30.0));
        assert_eq!(ci.low, Watts(30.0));
        assert_eq!(ci.high, Watts(40.0));
        assert!((ci.width() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_validity() {
        assert!(Percent(0.0).is_valid());
        assert!(Percent(100.0).is_valid());
        assert!(!Percent(100.5).is_valid());
        assert!(!Percent(-1.0).is_valid());
        assert!(!Percent(f64::NAN).is_valid());
    }

    #[test]
    fn test_units_serialize_transparently() {
        let sibling = SiblingContainer {
            cpu_request: Cores(0.5),
            cpu_util: Percent(12.5),
        };
        let json = serde_json::to_value(sibling).unwrap();
        assert_eq!(json["cpu_request"], 0.5);
        assert_eq!(json["cpu_util"], 12.5);
    }

    #[test]
    fn test_container_ref_display() {
        let target = ContainerRef::new("app", "app-7d9f", "prod");
        assert_eq!(target.to_string(), "prod/app-7d9f/app");
    }
}
