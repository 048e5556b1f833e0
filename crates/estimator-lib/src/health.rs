//! Component health for the estimator service
//!
//! Backs the `/health`, `/ready` and `/live` probes. Internal failures
//! (lock poisoning, collaborator outages) degrade the owning component;
//! bad client input never does.

use crate::error::EstimatorError;
use crate::models::ModelProvenance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, but the last operation hit an internal failure
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Worst of `statuses`; healthy when empty
    pub fn worst(statuses: impl IntoIterator<Item = ComponentStatus>) -> Self {
        statuses.into_iter().max().unwrap_or(ComponentStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of the `/health` probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    /// Whether predictions currently use default or calibrated parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_provenance: Option<ModelProvenance>,
    pub components: HashMap<String, ComponentHealth>,
}

/// Body of the `/ready` probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const FORECASTER: &str = "forecaster";
    pub const CALIBRATION: &str = "calibration";
    pub const API: &str = "api";

    pub const ALL: [&str; 3] = [FORECASTER, CALIBRATION, API];
}

#[derive(Debug, Default)]
struct RegistryState {
    components: HashMap<String, ComponentHealth>,
    initialized: bool,
}

impl RegistryState {
    fn status(&self) -> ComponentStatus {
        ComponentStatus::worst(self.components.values().map(|c| c.status))
    }
}

/// Shared, cloneable view of component health and startup state
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every estimator component as healthy
    pub async fn register_all(&self) {
        let mut state = self.state.write().await;
        for name in components::ALL {
            state
                .components
                .insert(name.to_string(), ComponentHealth::healthy());
        }
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Fold an operation's outcome into `name`'s health
    ///
    /// Client errors leave the component as it is.
    pub async fn observe<T>(&self, name: &str, outcome: &Result<T, EstimatorError>) {
        match outcome {
            Ok(_) => self.set_healthy(name).await,
            Err(err) if err.is_client_error() => {}
            Err(err) => self.set_degraded(name, err.to_string()).await,
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.initialized = ready;
    }

    pub async fn health(&self, model_provenance: Option<ModelProvenance>) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_provenance,
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if !state.initialized {
            Some("Estimator not yet initialized".to_string())
        } else if state.status() == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy".to_string())
        } else {
            None
        };
        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_status() {
        assert_eq!(ComponentStatus::worst(Vec::<ComponentStatus>::new()), ComponentStatus::Healthy);
        assert_eq!(
            ComponentStatus::worst([ComponentStatus::Degraded, ComponentStatus::Healthy]),
            ComponentStatus::Degraded
        );
        assert_eq!(
            ComponentStatus::worst([ComponentStatus::Unhealthy, ComponentStatus::Degraded]),
            ComponentStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health(None).await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Estimator not yet initialized"));
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        let health = registry.health(Some(ModelProvenance::Default)).await;
        assert_eq!(health.components.len(), 3);
        assert!(health.components.contains_key(components::CALIBRATION));
        assert_eq!(health.model_provenance, Some(ModelProvenance::Default));
    }

    #[tokio::test]
    async fn test_client_errors_do_not_degrade() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        let outcome: Result<(), _> = Err(EstimatorError::InsufficientData {
            required: 3,
            actual: 1,
        });
        registry.observe(components::FORECASTER, &outcome).await;
        assert_eq!(
            registry.health(None).await.status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_internal_errors_degrade_then_recover() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        let failed: Result<(), _> = Err(EstimatorError::LockPoisoned("writer panicked".into()));
        registry.observe(components::CALIBRATION, &failed).await;

        let health = registry.health(None).await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.components[components::CALIBRATION]
            .message
            .as_deref()
            .unwrap_or_default()
            .contains("poisoned"));

        registry.observe(components::CALIBRATION, &Ok::<(), EstimatorError>(())).await;
        assert_eq!(registry.health(None).await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_readiness() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::API, "listener closed").await;
        assert_eq!(
            registry.readiness().await.reason.as_deref(),
            Some("Critical component unhealthy")
        );
    }
}
