//! Integration tests for the estimator API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cost_estimator::api::{create_router, AppState};
use estimator_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{EstimatorMetrics, StructuredLogger},
    ForecastConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;
    health_registry.set_ready(true).await;

    let state = Arc::new(AppState::new(
        ForecastConfig::default(),
        health_registry,
        EstimatorMetrics::new(),
        StructuredLogger::new("test-estimator"),
    ));
    (create_router(state.clone()), state)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn prediction_body() -> Value {
    json!({
        "container_name": "api",
        "pod_name": "api-5c8d",
        "namespace": "shop",
        "historical_cpu_cores": [0.8, 0.82, 0.85, 0.83, 0.81, 0.84],
        "container_cpu_request": 1.0,
        "node_current_util": 45.5,
        "node_idle_util": 5.0,
        "containers_on_node": [],
        "prediction_horizon_minutes": 30
    })
}

fn calibration_body() -> Value {
    json!({
        "container_node_data": [
            {"container_cpu_cores": 0.5, "node_cpu_util_percent": 15.2},
            {"container_cpu_cores": 1.0, "node_cpu_util_percent": 28.5},
            {"container_cpu_cores": 1.5, "node_cpu_util_percent": 42.1},
            {"container_cpu_cores": 2.0, "node_cpu_util_percent": 55.8}
        ],
        "node_power_data": [
            {"node_cpu_util_percent": 10.0, "node_power_watts": 58.0},
            {"node_cpu_util_percent": 25.0, "node_power_watts": 68.0},
            {"node_cpu_util_percent": 50.0, "node_power_watts": 85.0},
            {"node_cpu_util_percent": 75.0, "node_power_watts": 103.0},
            {"node_cpu_util_percent": 100.0, "node_power_watts": 120.0}
        ]
    })
}

#[tokio::test]
async fn test_predict_energy_scenario() {
    let (app, _state) = setup_test_app().await;
    let (status, body) = send(app, "POST", "/predict/energy", Some(prediction_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let prediction = &body["prediction"];
    assert_eq!(prediction["container_name"], "api");
    assert_eq!(prediction["prediction_horizon_minutes"], 30);
    assert_eq!(prediction["model_provenance"], "default");

    let watts = prediction["predicted_power_watts"].as_f64().unwrap();
    let low = prediction["confidence_interval"]["low"].as_f64().unwrap();
    let high = prediction["confidence_interval"]["high"].as_f64().unwrap();
    assert!(watts > 10.0 && watts < 100.0, "predicted {}", watts);
    assert!(low < high);
}

#[tokio::test]
async fn test_predict_insufficient_data_is_400() {
    let (app, state) = setup_test_app().await;
    let mut body = prediction_body();
    body["historical_cpu_cores"] = json!([0.5, 0.6]);

    let (status, error) = send(app, "POST", "/predict/energy", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INSUFFICIENT_DATA");

    // bad input must not degrade the forecaster
    let health = state.health_registry.health(None).await;
    assert_eq!(
        health.components[components::FORECASTER].status,
        ComponentStatus::Healthy
    );
}

#[tokio::test]
async fn test_predict_invalid_horizon_is_400() {
    let (app, _state) = setup_test_app().await;
    let mut body = prediction_body();
    body["prediction_horizon_minutes"] = json!(0);

    let (status, error) = send(app, "POST", "/predict/energy", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_HORIZON");
}

#[tokio::test]
async fn test_predict_validation_errors_are_400() {
    let (app, _state) = setup_test_app().await;

    let mut body = prediction_body();
    body["node_idle_util"] = json!(80.0);
    let (status, error) = send(app.clone(), "POST", "/predict/energy", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_REQUEST");

    let mut body = prediction_body();
    body.as_object_mut().unwrap().remove("container_cpu_request");
    let (status, error) = send(app, "POST", "/predict/energy", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_calibrate_then_config_reports_calibrated_model() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = send(app.clone(), "POST", "/calibrate", Some(calibration_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "calibration_successful");
    let slope = body["calibration"]["container_to_node_slope"].as_f64().unwrap();
    let power_slope = body["calibration"]["node_util_to_power_slope"].as_f64().unwrap();
    assert!((slope - 27.08).abs() < 1e-6);
    assert!((power_slope - 0.6917).abs() < 1e-3);
    assert!(body["fit_quality"]["node_util_to_power_r2"].as_f64().unwrap() > 0.99);

    let (status, config) = send(app.clone(), "GET", "/calibration/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["model_provenance"], "calibrated");
    assert_eq!(config["calibration"]["container_to_node_slope"], body["calibration"]["container_to_node_slope"]);

    let (_, prediction) = send(app, "POST", "/predict/energy", Some(prediction_body())).await;
    assert_eq!(prediction["prediction"]["model_provenance"], "calibrated");
}

#[tokio::test]
async fn test_degenerate_calibration_is_400_and_keeps_model() {
    let (app, _state) = setup_test_app().await;
    let mut body = calibration_body();
    body["container_node_data"] = json!([
        {"container_cpu_cores": 1.0, "node_cpu_util_percent": 30.0},
        {"container_cpu_cores": 1.0, "node_cpu_util_percent": 30.0}
    ]);

    let (status, error) = send(app.clone(), "POST", "/calibrate", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "DEGENERATE_REGRESSION");

    let (_, config) = send(app, "GET", "/calibration/config", None).await;
    assert_eq!(config["model_provenance"], "default");
    assert_eq!(config["calibration"]["container_to_node_slope"], 23.993);
}

#[tokio::test]
async fn test_validate_and_reset() {
    let (app, state) = setup_test_app().await;
    send(app.clone(), "POST", "/calibrate", Some(calibration_body())).await;

    let measurements = json!({
        "measurements": [
            {"container_cpu_cores": 1.0, "actual_node_util": 28.5, "actual_power": 70.0},
            {"container_cpu_cores": 2.0, "actual_node_util": 55.8, "actual_power": 89.0}
        ]
    });
    let (status, body) = send(app.clone(), "POST", "/calibration/validate", Some(measurements)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validation"]["samples"], 2);
    assert_eq!(body["model_provenance"], "calibrated");
    assert!(body["validation"]["utilization_mae"].as_f64().unwrap() < 1.0);

    let (status, body) = send(app.clone(), "POST", "/calibration/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_provenance"], "default");

    let (status, _) = send(
        app,
        "POST",
        "/calibration/validate",
        Some(json!({"measurements": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let health = state.health_registry.health(None).await;
    assert_eq!(
        health.components[components::CALIBRATION].status,
        ComponentStatus::Healthy
    );

    let metrics = state.metrics.render().unwrap();
    assert!(metrics.contains("cost_estimator_validations_total"));
}

#[tokio::test]
async fn test_health_probes() {
    let (app, state) = setup_test_app().await;

    let (status, health) = send(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_provenance"], "default");

    let (status, _) = send(app.clone(), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, live) = send(app.clone(), "GET", "/live", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["status"], "alive");

    state
        .health_registry
        .set_unhealthy(components::API, "listener closed")
        .await;
    let (status, _) = send(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, ready) = send(app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["ready"], false);
}

#[tokio::test]
async fn test_not_ready_before_initialization() {
    let state = Arc::new(AppState::new(
        ForecastConfig::default(),
        HealthRegistry::new(),
        EstimatorMetrics::new(),
        StructuredLogger::new("test-estimator"),
    ));
    let (status, _) = send(create_router(state), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app().await;
    send(app.clone(), "POST", "/predict/energy", Some(prediction_body())).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("cost_estimator_predictions_total"));
    assert!(text.contains("cost_estimator_prediction_latency_seconds"));
}
