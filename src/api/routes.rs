//! API route definitions.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::error::ApiResult;
use super::state::AppState;
use crate::simulate::inputs::FormInputs;
use crate::simulate::Action;
use crate::store::TimeSeriesSample;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/security", get(security_snapshot))
        .route("/security/series", get(security_series))
        .route("/security/features", get(security_features))
        .route("/security/features/{name}", put(update_feature))
        .route("/security/points", post(add_point))
        .route("/security/reset", post(reset))
        .route("/security/events", get(security_events))
        .route("/simulation/logs", get(simulation_logs).delete(clear_logs))
        .route("/simulation/inputs", get(get_inputs).put(put_inputs))
        .route("/simulation/inputs/store", post(store_inputs))
        .route("/simulation/validation", get(get_validation).put(put_validation))
        .route("/simulation/normal", post(submit_normal))
        .route("/simulation/outlier", post(submit_outlier))
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({
        "data": data,
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn health() -> Json<Value> {
    envelope(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

async fn security_snapshot(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.store.read().await.snapshot();
    envelope(json!(snapshot))
}

async fn security_series(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    envelope(json!({
        "revision": store.revision(),
        "anomaly": store.anomaly_series(),
        "confidence": store.confidence_series(),
    }))
}

async fn security_features(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    envelope(json!({
        "revision": store.revision(),
        "features": store.anomalous_inputs(),
    }))
}

#[derive(Debug, Deserialize)]
struct NewPoint {
    time: Option<String>,
    score: f64,
    confidence: f64,
}

async fn add_point(
    State(state): State<AppState>,
    Json(body): Json<NewPoint>,
) -> ApiResult<Json<Value>> {
    let time = body
        .time
        .unwrap_or_else(|| chrono::Local::now().format("%H:%M:%S").to_string());
    let sample = TimeSeriesSample::new(time, body.score, body.confidence)?;

    let mut store = state.store.write().await;
    store.add_data_point(&sample);
    Ok(envelope(json!({
        "revision": store.revision(),
        "point": store.anomaly_series().latest(),
    })))
}

#[derive(Debug, Deserialize)]
struct FeatureScore {
    score: f64,
}

async fn update_feature(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<FeatureScore>,
) -> Json<Value> {
    let mut store = state.store.write().await;
    store.update_anomalous_inputs(&name, body.score);
    envelope(json!({
        "revision": store.revision(),
        "features": store.anomalous_inputs(),
    }))
}

async fn reset(State(state): State<AppState>) -> Json<Value> {
    let mut store = state.store.write().await;
    store.reset_data();
    envelope(json!(store.snapshot()))
}

async fn security_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.store.read().await.subscribe();

    // A lagged subscriber gets a full snapshot so it can redraw from scratch.
    let events = stream::unfold((rx, state.store), |(mut rx, store)| async move {
        loop {
            let encoded = match rx.recv().await {
                Ok(event) => Event::default().event(event.name()).json_data(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged behind store, sending resync");
                    let snapshot = store.read().await.snapshot();
                    Event::default().event("resync").json_data(&snapshot)
                }
                Err(RecvError::Closed) => return None,
            };
            match encoded {
                Ok(sse) => return Some((Ok::<_, Infallible>(sse), (rx, store))),
                Err(e) => warn!(error = %e, "failed to encode store event"),
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

async fn simulation_logs(State(state): State<AppState>) -> Json<Value> {
    let logs = state.driver.logs().await;
    Json(json!({ "data": logs, "meta": { "total": logs.len() } }))
}

async fn clear_logs(State(state): State<AppState>) -> Json<Value> {
    state.driver.clear_logs().await;
    Json(json!({ "data": [], "meta": { "total": 0 } }))
}

async fn get_inputs(State(state): State<AppState>) -> Json<Value> {
    envelope(json!({
        "current": state.driver.inputs().await,
        "stored": state.driver.stored_inputs().await,
    }))
}

async fn put_inputs(State(state): State<AppState>, Json(inputs): Json<FormInputs>) -> Json<Value> {
    state.driver.set_inputs(inputs.clone()).await;
    envelope(json!({ "current": inputs }))
}

async fn store_inputs(State(state): State<AppState>) -> Json<Value> {
    let stored = state.driver.store_inputs().await;
    envelope(json!({ "stored": stored }))
}

#[derive(Debug, Deserialize)]
struct ValidationToggle {
    enabled: bool,
}

async fn get_validation(State(state): State<AppState>) -> Json<Value> {
    envelope(json!({ "enabled": state.driver.validation_enabled().await }))
}

async fn put_validation(
    State(state): State<AppState>,
    Json(toggle): Json<ValidationToggle>,
) -> Json<Value> {
    state.driver.set_validation(toggle.enabled).await;
    envelope(json!({ "enabled": toggle.enabled }))
}

async fn submit_normal(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let outcome = state.driver.submit(Action::SubmitNormal).await?;
    Ok(envelope(json!(outcome)))
}

async fn submit_outlier(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let outcome = state.driver.submit(Action::InjectOutlier).await?;
    Ok(envelope(json!(outcome)))
}
