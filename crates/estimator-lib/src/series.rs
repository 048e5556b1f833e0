//! Historical CPU usage series
//!
//! Built fresh for every request from caller-supplied arrays (or by a
//! metrics-history collaborator) and never mutated afterwards.

use crate::error::{EstimatorError, Result};
use chrono::{DateTime, Duration, Utc};

/// Metric name attached to series fed to the forecaster
pub const CPU_CORES_METRIC: &str = "cpu_cores";

/// Spacing used when a caller supplies values without timestamps
pub const DEFAULT_SAMPLE_SPACING_SECS: i64 = 60;

/// Ordered CPU usage samples (cores) with strictly increasing timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    metric_name: String,
}

impl HistoricalSeries {
    /// Build a series, validating length, ordering and sample values
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(EstimatorError::InvalidSeries(
                "series must contain at least one sample".to_string(),
            ));
        }
        if timestamps.len() != values.len() {
            return Err(EstimatorError::InvalidSeries(format!(
                "{} timestamps for {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(idx) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(EstimatorError::InvalidSeries(format!(
                "timestamps must be strictly increasing (violated at index {})",
                idx + 1
            )));
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(EstimatorError::InvalidSeries(format!(
                "value at index {} must be a finite, non-negative core count",
                idx
            )));
        }

        Ok(Self {
            timestamps,
            values,
            metric_name: CPU_CORES_METRIC.to_string(),
        })
    }

    /// Build a series from bare values, spacing samples `step` apart and
    /// ending at `end`
    pub fn from_values(values: Vec<f64>, end: DateTime<Utc>, step: Duration) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(EstimatorError::InvalidSeries(
                "sample spacing must be positive".to_string(),
            ));
        }
        let n = values.len() as i32;
        let timestamps = (0..n).map(|i| end - step * (n - 1 - i)).collect();
        Self::new(timestamps, values)
    }

    /// Build a series from bare values at the default one-minute spacing
    pub fn from_values_ending_now(values: Vec<f64>) -> Result<Self> {
        Self::from_values(
            values,
            Utc::now(),
            Duration::seconds(DEFAULT_SAMPLE_SPACING_SECS),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// Median delta between consecutive samples, in seconds
    ///
    /// Returns `None` for a single-sample series.
    pub fn median_step_secs(&self) -> Option<f64> {
        let mut deltas: Vec<f64> = self
            .timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
            .collect();
        if deltas.is_empty() {
            return None;
        }
        deltas.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = deltas.len() / 2;
        if deltas.len() % 2 == 0 {
            Some((deltas[mid - 1] + deltas[mid]) / 2.0)
        } else {
            Some(deltas[mid])
        }
    }

    /// Keep only the most recent `max_points` samples
    pub fn most_recent(&self, max_points: usize) -> Self {
        if self.len() <= max_points || max_points == 0 {
            return self.clone();
        }
        let start = self.len() - max_points;
        Self {
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
            metric_name: self.metric_name.clone(),
        }
    }
}
