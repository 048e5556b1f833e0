//! Simple linear regression for the calibration sub-models

use crate::error::{EstimatorError, Result};
use crate::stats::{distinct_count, mean};
use serde::{Deserialize, Serialize};

/// Minimum number of (x, y) pairs for a fit
pub const MIN_CALIBRATION_SAMPLES: usize = 2;

/// Ordinary least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 1.0 when y has no spread
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Fit a line through `samples`, naming `relationship` in any error
    pub fn fit(relationship: &'static str, samples: &[(f64, f64)]) -> Result<Self> {
        if samples.len() < MIN_CALIBRATION_SAMPLES {
            return Err(EstimatorError::DegenerateRegression {
                relationship,
                reason: format!(
                    "need at least {} samples, got {}",
                    MIN_CALIBRATION_SAMPLES,
                    samples.len()
                ),
            });
        }
        if samples.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(EstimatorError::InvalidRequest(format!(
                "{} samples must be finite",
                relationship
            )));
        }

        let xs: Vec<f64> = samples.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = samples.iter().map(|(_, y)| *y).collect();
        if distinct_count(&xs) < 2 {
            return Err(EstimatorError::DegenerateRegression {
                relationship,
                reason: "independent variable has no variance".to_string(),
            });
        }

        let (mx, my) = (mean(&xs), mean(&ys));
        let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
        let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
        if sxx <= 0.0 {
            return Err(EstimatorError::DegenerateRegression {
                relationship,
                reason: "independent variable has no variance".to_string(),
            });
        }

        let slope = sxy / sxx;
        let intercept = my - slope * mx;

        let sst: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
        let ssr: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
            .sum();
        let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 1.0 };

        Ok(Self {
            slope,
            intercept,
            r_squared,
        })
    }
}
