//! Autoregressive model fitting
//!
//! AR(p) with intercept, fit by least squares on lagged values. The order is
//! picked by small-sample corrected AIC (AICc) over a common effective sample
//! so candidates are compared on the same observations. Non-stationary fits
//! fall back to a random walk on first differences, without a drift term, so
//! the projection holds the last observed level.

use crate::stats::least_squares;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Floor applied to the residual variance inside the AICc log term
const AICC_VARIANCE_FLOOR: f64 = 1e-300;

/// Sum of |phi| must stay this far below one to count as stationary
const STATIONARITY_MARGIN: f64 = 1e-6;

/// Which model family produced a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastModel {
    /// Series had no variance; forecast repeats the constant
    Constant,
    /// Stationary AR(p) with intercept
    Autoregressive { order: usize },
    /// Random walk on first differences, projecting the last level
    RandomWalk,
}

impl ForecastModel {
    pub fn describe(&self) -> String {
        match self {
            ForecastModel::Constant => "constant".to_string(),
            ForecastModel::Autoregressive { order } => format!("AR({})", order),
            ForecastModel::RandomWalk => "random_walk".to_string(),
        }
    }
}

/// A fitted model ready to project forward
#[derive(Debug, Clone)]
pub(crate) struct FittedModel {
    pub model: ForecastModel,
    intercept: f64,
    /// `coefficients[i]` multiplies the value `i + 1` steps back
    coefficients: Vec<f64>,
    /// Unbiased one-step-ahead error variance
    pub one_step_variance: f64,
    /// In-sample (actual, fitted) pairs used for accuracy metrics
    pub fitted_pairs: Vec<(f64, f64)>,
}

impl FittedModel {
    pub(crate) fn constant(value: f64, len: usize) -> Self {
        Self {
            model: ForecastModel::Constant,
            intercept: value,
            coefficients: Vec::new(),
            one_step_variance: 0.0,
            fitted_pairs: vec![(value, value); len],
        }
    }

    /// Project `steps` values past the end of `history`
    pub(crate) fn project(&self, history: &[f64], steps: usize) -> Vec<f64> {
        match self.model {
            ForecastModel::Constant => vec![self.intercept; steps],
            ForecastModel::RandomWalk => {
                vec![history.last().copied().unwrap_or(0.0); steps]
            }
            ForecastModel::Autoregressive { .. } => {
                let mut buffer: Vec<f64> = history.to_vec();
                let mut out = Vec::with_capacity(steps);
                for _ in 0..steps {
                    let next = self.intercept
                        + self
                            .coefficients
                            .iter()
                            .enumerate()
                            .map(|(i, phi)| phi * buffer[buffer.len() - 1 - i])
                            .sum::<f64>();
                    buffer.push(next);
                    out.push(next);
                }
                out
            }
        }
    }

    /// Sufficient stationarity condition: sum of |phi| below one
    fn is_stationary(&self) -> bool {
        self.coefficients.iter().map(|c| c.abs()).sum::<f64>() < 1.0 - STATIONARITY_MARGIN
    }
}

/// Largest AR order whose AICc correction stays finite on the common sample
pub(crate) fn max_feasible_order(len: usize, configured_max: usize) -> usize {
    (len.saturating_sub(3) / 2).min(configured_max)
}

/// Fit the best model for `values` (expects at least 3 non-constant points)
pub(crate) fn fit(values: &[f64], configured_max_order: usize) -> FittedModel {
    let max_order = max_feasible_order(values.len(), configured_max_order);

    let mut best: Option<(f64, FittedModel)> = None;
    for order in 0..=max_order {
        let Some((aicc, candidate)) = fit_order(values, order, max_order) else {
            debug!(order, "AR candidate singular, skipping");
            continue;
        };
        debug!(order, aicc, "AR candidate fitted");
        let better = match &best {
            None => true,
            Some((best_aicc, _)) => aicc < *best_aicc,
        };
        if better {
            best = Some((aicc, candidate));
        }
    }

    match best {
        Some((_, model)) if model.is_stationary() => model,
        Some((_, model)) => {
            debug!(
                model = %model.model.describe(),
                "AR fit not stationary, falling back to random walk"
            );
            fit_random_walk(values)
        }
        None => fit_random_walk(values),
    }
}

/// Fit AR(`order`) on observations `start..len`, returning its AICc
fn fit_order(values: &[f64], order: usize, start: usize) -> Option<(f64, FittedModel)> {
    let design: Vec<Vec<f64>> = (start..values.len())
        .map(|t| {
            let mut row = Vec::with_capacity(order + 1);
            row.push(1.0);
            row.extend((1..=order).map(|lag| values[t - lag]));
            row
        })
        .collect();
    let targets = &values[start..];

    let beta = least_squares(&design, targets)?;

    let fitted_pairs: Vec<(f64, f64)> = design
        .iter()
        .zip(targets)
        .map(|(row, y)| {
            let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            (*y, fitted)
        })
        .collect();
    let rss: f64 = fitted_pairs.iter().map(|(y, f)| (y - f).powi(2)).sum();

    let m = targets.len();
    let params = order + 1;
    if m < params + 2 {
        return None;
    }
    let (m_f, k_f) = (m as f64, params as f64);
    let aic = m_f * (rss / m_f).max(AICC_VARIANCE_FLOOR).ln() + 2.0 * k_f;
    let aicc = aic + 2.0 * k_f * (k_f + 1.0) / (m_f - k_f - 1.0);

    Some((
        aicc,
        FittedModel {
            model: ForecastModel::Autoregressive { order },
            intercept: beta[0],
            coefficients: beta[1..].to_vec(),
            one_step_variance: rss / (m - params) as f64,
            fitted_pairs,
        },
    ))
}

/// Random walk: each value predicts the next, so the one-step errors are
/// the first differences themselves (no parameters are estimated)
fn fit_random_walk(values: &[f64]) -> FittedModel {
    let fitted_pairs: Vec<(f64, f64)> = values.windows(2).map(|w| (w[1], w[0])).collect();
    let one_step_variance = if fitted_pairs.is_empty() {
        0.0
    } else {
        fitted_pairs.iter().map(|(y, f)| (y - f).powi(2)).sum::<f64>() / fitted_pairs.len() as f64
    };

    FittedModel {
        model: ForecastModel::RandomWalk,
        intercept: 0.0,
        coefficients: Vec::new(),
        one_step_variance,
        fitted_pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::mean;

    #[test]
    fn test_max_feasible_order() {
        assert_eq!(max_feasible_order(3, 3), 0);
        assert_eq!(max_feasible_order(5, 3), 1);
        assert_eq!(max_feasible_order(6, 3), 1);
        assert_eq!(max_feasible_order(100, 3), 3);
    }

    #[test]
    fn test_linear_trend_holds_last_level() {
        let values: Vec<f64> = (0..10).map(|i| 1.0 + 0.1 * i as f64).collect();
        let fitted = fit(&values, 3);
        assert_eq!(fitted.model, ForecastModel::RandomWalk);
        let projection = fitted.project(&values, 240);
        assert!(projection.iter().all(|v| (v - 1.9).abs() < 1e-9));
        // every step moved by 0.1
        assert!((fitted.one_step_variance - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_trending_usage_does_not_run_away() {
        let values = [1.0, 1.3, 1.5, 1.9, 2.1, 2.4, 2.7, 3.1];
        let fitted = fit(&values, 3);
        assert_eq!(fitted.model, ForecastModel::RandomWalk);
        let projection = fitted.project(&values, 240);
        assert!(projection.iter().all(|v| (v - 3.1).abs() < 1e-9));
        assert!(fitted.one_step_variance > 0.0);
    }

    #[test]
    fn test_noisy_level_series_stays_bounded() {
        let values = vec![
            1.0, 1.2, 0.9, 1.1, 0.95, 1.05, 1.0, 1.15, 0.85, 1.1, 0.9, 1.05, 1.0, 0.95,
        ];
        let fitted = fit(&values, 3);
        assert_ne!(fitted.model, ForecastModel::Constant);
        let projection = fitted.project(&values, 20);
        for v in projection {
            assert!(v > 0.5 && v < 1.5, "projection drifted to {}", v);
        }
    }

    #[test]
    fn test_ar1_process_recovers_coefficient_sign() {
        // x_t = 0.5 + 0.5 * x_{t-1} + e_t with a fixed shock pattern
        let shocks = [0.2, 0.1, -0.1, -0.2, 0.05, 0.15, -0.15, -0.05, 0.0, 0.0];
        let mut values = vec![1.0];
        for i in 0..40 {
            let prev = *values.last().unwrap();
            values.push(0.5 + 0.5 * prev + shocks[i % shocks.len()]);
        }
        let fitted = fit(&values, 1);
        assert_eq!(fitted.model, ForecastModel::Autoregressive { order: 1 });
        assert!(fitted.coefficients[0] > 0.0 && fitted.coefficients[0] < 1.0);
        // Long-run forecast converges towards the process mean
        let projection = fitted.project(&values, 200);
        let level = projection[199];
        assert!((level - mean(&values)).abs() < 0.2, "level {}", level);
    }

    #[test]
    fn test_short_series_uses_order_zero() {
        let values = vec![0.8, 0.9, 0.85];
        let fitted = fit(&values, 3);
        assert_eq!(fitted.model, ForecastModel::Autoregressive { order: 0 });
        let projection = fitted.project(&values, 2);
        assert!((projection[0] - 0.85).abs() < 1e-9);
        assert!(fitted.one_step_variance > 0.0);
    }

    #[test]
    fn test_constant_projection() {
        let fitted = FittedModel::constant(0.5, 4);
        assert_eq!(fitted.project(&[0.5; 4], 3), vec![0.5, 0.5, 0.5]);
        assert_eq!(fitted.one_step_variance, 0.0);
    }
}
