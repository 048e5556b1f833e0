//! HTTP API: prediction, calibration, health and Prometheus metrics

use crate::dto::{
    CalibrationRequest, CalibrationResponse, EnergyPredictionRequest, LivenessResponse,
    ModelConfigResponse, PredictionEnvelope, ValidationRequest, ValidationResponse,
};
use crate::error::AppError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use estimator_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{EstimatorMetrics, StructuredLogger},
    CalibrationEngine, EnergyPredictor, ForecastConfig, ModelProvenance,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: EnergyPredictor,
    pub health_registry: HealthRegistry,
    pub metrics: EstimatorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        forecast_config: ForecastConfig,
        health_registry: HealthRegistry,
        metrics: EstimatorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            predictor: EnergyPredictor::new(forecast_config, CalibrationEngine::new()),
            health_registry,
            metrics,
            logger,
        }
    }

    pub fn calibration(&self) -> &CalibrationEngine {
        self.predictor.calibration()
    }
}

async fn predict_energy(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EnergyPredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionEnvelope>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        state.metrics.inc_prediction_errors();
        AppError::from(rejection)
    })?;

    let start = Instant::now();
    let outcome = body
        .into_domain()
        .and_then(|request| state.predictor.predict(&request));
    let elapsed = start.elapsed().as_secs_f64();
    state
        .health_registry
        .observe(components::FORECASTER, &outcome)
        .await;

    match outcome {
        Ok(prediction) => {
            state.metrics.observe_prediction_latency(elapsed);
            state.metrics.record_prediction(&prediction);
            state.logger.log_prediction(&prediction, elapsed);
            Ok(Json(PredictionEnvelope {
                prediction,
                status: "success".to_string(),
            }))
        }
        Err(err) => {
            state.metrics.inc_prediction_errors();
            state
                .logger
                .log_prediction_failed(err.code(), &err.to_string());
            Err(err.into())
        }
    }
}

async fn calibrate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalibrationRequest>, JsonRejection>,
) -> Result<Json<CalibrationResponse>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        state.metrics.inc_calibration_errors();
        AppError::from(rejection)
    })?;

    let outcome = state
        .calibration()
        .calibrate(&body.container_node_pairs(), &body.node_power_pairs());
    state
        .health_registry
        .observe(components::CALIBRATION, &outcome)
        .await;

    match outcome {
        Ok(report) => {
            state.metrics.inc_calibrations();
            state.metrics.set_model_provenance(ModelProvenance::Calibrated);
            state.logger.log_calibration(&report);
            Ok(Json(report.into()))
        }
        Err(err) => {
            state.metrics.inc_calibration_errors();
            state
                .logger
                .log_calibration_failed(err.code(), &err.to_string());
            Err(err.into())
        }
    }
}

async fn calibration_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelConfigResponse>, AppError> {
    let active = state.calibration().active()?;
    Ok(Json(ModelConfigResponse::from(active.as_ref())))
}

async fn validate_calibration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> Result<Json<ValidationResponse>, AppError> {
    let Json(body) = payload?;

    let outcome = state.calibration().validate(&body.measurements);
    state
        .health_registry
        .observe(components::CALIBRATION, &outcome)
        .await;

    let report = outcome?;
    state.metrics.inc_validations();
    Ok(Json(report.into()))
}

async fn reset_calibration(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelConfigResponse>, AppError> {
    let active = state.calibration().reset()?;
    state.metrics.set_model_provenance(active.provenance);
    state.logger.log_model_reset();
    Ok(Json(ModelConfigResponse::from(active.as_ref())))
}

/// 200 while operational, 503 once any component is unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provenance = state.calibration().active().ok().map(|a| a.provenance);
    let health = state.health_registry.health(provenance).await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn live() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::internal(format!("Failed to encode metrics: {}", e)))?;
    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        body,
    ))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict/energy", post(predict_energy))
        .route("/calibrate", post(calibrate))
        .route("/calibration/config", get(calibration_config))
        .route("/calibration/validate", post(validate_calibration))
        .route("/calibration/reset", post(reset_calibration))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/metrics", get(metrics))
        .with_state(state)
}

pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
