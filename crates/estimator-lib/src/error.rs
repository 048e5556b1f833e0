//! Error taxonomy for the estimator core
//!
//! None of these are raised after shared state has been modified.

use thiserror::Error;

/// Result alias used throughout the estimator core
pub type Result<T> = std::result::Result<T, EstimatorError>;

/// Errors produced by forecasting, power-model application and calibration
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Fewer historical points than the forecaster needs
    #[error("insufficient historical data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Horizon is non-positive or beyond the configured maximum
    #[error("invalid prediction horizon {horizon_minutes} minutes (allowed 1..={max_minutes})")]
    InvalidHorizon { horizon_minutes: i64, max_minutes: u32 },

    /// Calibration input has no spread in the independent variable
    #[error("degenerate regression for {relationship}: {reason}")]
    DegenerateRegression {
        relationship: &'static str,
        reason: String,
    },

    /// Historical series violates its structural invariants
    #[error("invalid historical series: {0}")]
    InvalidSeries(String),

    /// Request fields outside their documented ranges
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The active model lock was poisoned by a panicking writer
    #[error("active power model lock poisoned: {0}")]
    LockPoisoned(String),

    /// An external collaborator (metrics history, sibling enumeration) failed
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] anyhow::Error),
}

impl EstimatorError {
    /// True when the caller supplied bad input (maps to a 4xx at the HTTP layer)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EstimatorError::InsufficientData { .. }
                | EstimatorError::InvalidHorizon { .. }
                | EstimatorError::DegenerateRegression { .. }
                | EstimatorError::InvalidSeries(_)
                | EstimatorError::InvalidRequest(_)
        )
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            EstimatorError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            EstimatorError::InvalidHorizon { .. } => "INVALID_HORIZON",
            EstimatorError::DegenerateRegression { .. } => "DEGENERATE_REGRESSION",
            EstimatorError::InvalidSeries(_) => "INVALID_SERIES",
            EstimatorError::InvalidRequest(_) => "INVALID_REQUEST",
            EstimatorError::LockPoisoned(_) => "INTERNAL_ERROR",
            EstimatorError::Collaborator(_) => "COLLABORATOR_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(EstimatorError::InsufficientData { required: 3, actual: 1 }.is_client_error());
        assert!(EstimatorError::InvalidHorizon { horizon_minutes: 0, max_minutes: 240 }
            .is_client_error());
        assert!(EstimatorError::DegenerateRegression {
            relationship: "container_to_node",
            reason: "no variance".to_string(),
        }
        .is_client_error());
        assert!(!EstimatorError::LockPoisoned("boom".to_string()).is_client_error());
        assert!(!EstimatorError::Collaborator(anyhow::anyhow!("down")).is_client_error());
    }

    #[test]
    fn test_error_messages() {
        let err = EstimatorError::InsufficientData { required: 3, actual: 2 };
        assert_eq!(
            err.to_string(),
            "insufficient historical data: need at least 3 points, got 2"
        );
        assert_eq!(err.code(), "INSUFFICIENT_DATA");
    }
}
