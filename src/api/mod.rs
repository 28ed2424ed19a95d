//! API layer -- axum routes, handlers, and middleware.

mod error;
mod routes;
pub mod state;

pub use self::error::{ApiError, ApiResult};

use self::state::AppState;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router with all API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::IntoResponse;
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    use crate::store::TimeSeriesSample;

    fn app() -> (AppState, Router) {
        let state = AppState::seeded(SimulationConfig::default().without_latency(), 42);
        (state.clone(), router(state))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1_000_000)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Open the event stream and return its body once the handler has subscribed.
    async fn open_events(app: &Router) -> Body {
        let request = Request::builder()
            .uri("/api/v1/security/events")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.into_body()
    }

    /// First SSE frame as `(event name, data)`.
    async fn first_event(body: Body) -> (String, Value) {
        let mut frames = body.into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .expect("no event within 5s")
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        let field = |name: &str| {
            text.lines()
                .find_map(|line| line.strip_prefix(name))
                .map(|v| v.trim_start().to_string())
                .unwrap_or_else(|| panic!("no {} field in {:?}", name, text))
        };
        let event = field("event:");
        let data = serde_json::from_str(&field("data:")).unwrap();
        (event, data)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_, app) = app();
        let (status, json) = call(&app, Method::GET, "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert!(json["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (_, app) = app();
        let (status, _) = call(&app, Method::GET, "/api/v1/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_series_start_from_seed() {
        let (_, app) = app();
        let (status, json) = call(&app, Method::GET, "/api/v1/security/series", None).await;

        assert_eq!(status, StatusCode::OK);
        let anomaly = json["data"]["anomaly"].as_array().unwrap();
        assert_eq!(anomaly.len(), 5);
        assert_eq!(anomaly[0]["time"], "Day 1");
        assert_eq!(json["data"]["confidence"][4]["confidence"], 0.96);
    }

    #[tokio::test]
    async fn test_post_point_updates_series() {
        let (state, app) = app();
        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/security/points",
            Some(json!({ "time": "t1", "score": 0.4, "confidence": 0.7 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["revision"], 1);
        assert_eq!(json["data"]["point"]["normal"], 0.25);
        assert_eq!(json["data"]["point"]["poisoned"], 0.25);

        let store = state.store.read().await;
        assert_eq!(store.anomaly_series().len(), 5);
        assert_eq!(store.anomaly_series().latest().unwrap().time, "t1");
    }

    #[tokio::test]
    async fn test_malformed_point_is_rejected() {
        let (state, app) = app();
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/security/points",
            Some(json!({ "time": "t1", "score": "high" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.store.read().await.revision(), 0);
    }

    #[tokio::test]
    async fn test_put_feature_then_reset() {
        let (_, app) = app();
        let (status, json) = call(
            &app,
            Method::PUT,
            "/api/v1/security/features/NewFeature",
            Some(json!({ "score": 0.42 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let features = json["data"]["features"].as_array().unwrap();
        assert_eq!(features.len(), 6);
        assert_eq!(features[5], json!({ "feature": "NewFeature", "score": 0.42 }));

        let (status, json) = call(&app, Method::POST, "/api/v1/security/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["anomalous_inputs"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_outlier_submission_reports_outcome() {
        let (_, app) = app();
        let (status, json) = call(&app, Method::POST, "/api/v1/simulation/outlier", None).await;

        assert_eq!(status, StatusCode::OK);
        let regime = json["data"]["regime"].as_str().unwrap();
        assert!(regime == "anomaly" || regime == "breach", "regime: {}", regime);
        assert_eq!(json["data"]["tamper_check"]["status"], "disabled");

        let (_, logs) = call(&app, Method::GET, "/api/v1/simulation/logs", None).await;
        assert_eq!(logs["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_tamper_flow_over_http() {
        let (_, app) = app();

        call(
            &app,
            Method::PUT,
            "/api/v1/simulation/validation",
            Some(json!({ "enabled": true })),
        )
        .await;
        call(&app, Method::POST, "/api/v1/simulation/inputs/store", None).await;
        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/v1/simulation/inputs",
            Some(json!({
                "tax_rate": "15",
                "gdp_growth": "5.2",
                "inflation": "35",
                "unemployment": "4.1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(&app, Method::POST, "/api/v1/simulation/normal", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["regime"], "breach");
        assert_eq!(json["data"]["tamper_check"]["status"], "tampered");
        assert_eq!(json["data"]["tamper_check"]["changed"], json!(["Inflation"]));
        assert_eq!(json["data"]["log_entry"]["severity"], "error");
    }

    #[tokio::test]
    async fn test_validation_toggle_round_trip() {
        let (_, app) = app();
        let (_, json) = call(&app, Method::GET, "/api/v1/simulation/validation", None).await;
        assert_eq!(json["data"]["enabled"], false);

        call(
            &app,
            Method::PUT,
            "/api/v1/simulation/validation",
            Some(json!({ "enabled": true })),
        )
        .await;
        let (_, json) = call(&app, Method::GET, "/api/v1/simulation/validation", None).await;
        assert_eq!(json["data"]["enabled"], true);
    }

    #[tokio::test]
    async fn test_event_stream_reports_new_point() {
        let (_, app) = app();
        let body = open_events(&app).await;

        call(
            &app,
            Method::POST,
            "/api/v1/security/points",
            Some(json!({ "time": "t1", "score": 0.9, "confidence": 0.3 })),
        )
        .await;

        let (event, data) = first_event(body).await;
        assert_eq!(event, "data_point_added");
        assert_eq!(data["kind"], "data_point_added");
        assert_eq!(data["revision"], 1);
        assert_eq!(data["point"]["time"], "t1");
    }

    #[tokio::test]
    async fn test_lagged_event_stream_gets_resync() {
        let (state, app) = app();
        let body = open_events(&app).await;

        {
            let mut store = state.store.write().await;
            for i in 0..100 {
                let sample = TimeSeriesSample::new(format!("t{}", i), 0.1, 0.9).unwrap();
                store.add_data_point(&sample);
            }
        }

        let (event, data) = first_event(body).await;
        assert_eq!(event, "resync");
        assert_eq!(data["revision"], 100);
        assert_eq!(data["anomaly_series"][4]["time"], "t99");
    }

    #[tokio::test]
    async fn test_clear_logs() {
        let (_, app) = app();
        call(&app, Method::POST, "/api/v1/simulation/normal", None).await;
        let (_, logs) = call(&app, Method::GET, "/api/v1/simulation/logs", None).await;
        assert_eq!(logs["meta"]["total"], 1);

        let (status, _) = call(&app, Method::DELETE, "/api/v1/simulation/logs", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, logs) = call(&app, Method::GET, "/api/v1/simulation/logs", None).await;
        assert_eq!(logs["meta"]["total"], 0);
        assert!(logs["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_busy_driver_maps_to_conflict() {
        let response = ApiError::from(crate::simulate::DriverError::Busy).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
