//! Core library for container energy estimation
//!
//! This crate provides:
//! - CPU usage forecasting from recent history
//! - Linear power models and per-container power attribution
//! - Calibration of the power model from field measurements
//! - Health checks and observability

pub mod calibration;
pub mod error;
pub mod forecast;
pub mod health;
pub mod models;
pub mod observability;
pub mod power;
pub mod predictor;
pub mod series;
pub mod stats;

pub use calibration::{
    ActiveModel, CalibrationEngine, CalibrationReport, ValidationMetrics, ValidationReport,
    ValidationSample,
};
pub use error::{EstimatorError, Result};
pub use forecast::{ForecastConfig, ForecastResult, WorkloadForecaster};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EstimatorMetrics, StructuredLogger};
pub use power::{BoundsWarning, PowerModel};
pub use predictor::{
    CollaboratorQuery, EnergyPredictor, InMemoryCollaborators, MetricsHistoryProvider,
    SiblingEnumerator,
};
pub use series::HistoricalSeries;
