// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! Cleaning requests, fleet status (JSON and SSE) and administration.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** axum router over [`CleaningService`]
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/request` | Deliver water to an aircraft; answers when done |
//! | GET | `/vehicles` | Current fleet snapshot |
//! | GET | `/vehicles/stream` | Server-Sent Events, one snapshot per transition |
//! | GET | `/health` | Liveness, uptime, coordinator mode |
//! | GET/POST | `/admin/config` | Read/update dispatch settings |
//! | POST | `/admin/capacity` | Set per-vehicle water capacity |
//! | POST | `/admin/vehicles/register` | Bulk-register vehicles |
//! | GET | `/admin/vehicles` | Fleet snapshot plus coordinator mode |
//! | POST | `/admin/reload` | Drain in-flight work and clear all state |

use crate::application::dispatcher::{CleaningService, DispatchError};
use crate::application::settings::{SettingsError, SettingsUpdate};
use crate::domain::cleaning::{CleaningRequest, ErrorBody};
use crate::domain::events::{FleetChange, FleetSnapshot};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub service: Arc<dyn CleaningService>,
    pub started_at: Instant,
}

pub fn app(service: Arc<dyn CleaningService>) -> Router {
    let state = Arc::new(AppState {
        service,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/request", post(request_cleaning))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/stream", get(stream_vehicles))
        .route("/health", get(health))
        .route("/admin/config", get(get_config).post(update_config))
        .route("/admin/capacity", post(update_capacity))
        .route("/admin/vehicles", get(admin_vehicles))
        .route("/admin/vehicles/register", post(register_vehicles))
        .route("/admin/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Failure of any handler, rendered as `{ errorCode, message }`.
#[derive(Debug)]
pub enum ApiError {
    Dispatch(DispatchError),
    Settings(SettingsError),
    BadRequest(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Dispatch(err)
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        ApiError::Settings(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Dispatch(DispatchError::Validation(e)) => (StatusCode::BAD_REQUEST, ErrorBody::from(&e)),
            ApiError::Dispatch(DispatchError::InvalidVehicleType) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(100, "Vehicle type is required"))
            }
            ApiError::Dispatch(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal()),
            ApiError::Settings(e) => (StatusCode::BAD_REQUEST, ErrorBody::new(100, e.to_string())),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody::new(100, message)),
        };
        (status, Json(body)).into_response()
    }
}

async fn request_cleaning(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CleaningRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let response = state.service.request_cleaning(request).await?;
    Ok(Json(response))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.fleet())
}

async fn stream_vehicles(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe first so nothing published after the initial snapshot is missed
    let receiver = state.service.subscribe();
    let current = FleetSnapshot::new(FleetChange::Current, state.service.fleet());

    let snapshots = stream::once(async move { current }).chain(receiver.into_stream());
    let events = snapshots.map(|snapshot| {
        let data = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().event("vehicles").data(data))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "coordinator_mode": state.service.coordinator_mode(),
        "vehicles": state.service.fleet().len(),
    }))
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.settings())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let settings = state.service.update_settings(&update)?;
    Ok(Json(settings))
}

#[derive(Deserialize)]
struct CapacityBody {
    #[serde(alias = "Capacity")]
    capacity: i64,
}

async fn update_capacity(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CapacityBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let capacity = state.service.set_capacity(body.capacity)?;
    Ok(Json(json!({ "capacity": capacity })))
}

async fn admin_vehicles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "coordinator_mode": state.service.coordinator_mode(),
        "vehicles": state.service.fleet(),
    }))
}

#[derive(Deserialize)]
struct RegisterVehiclesBody {
    #[serde(rename = "type", alias = "Type", default)]
    vehicle_type: String,
}

async fn register_vehicles(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterVehiclesBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let registered = state.service.register_vehicles(&body.vehicle_type).await?;
    Ok(Json(json!({
        "registered": registered,
        "vehicles": state.service.fleet(),
    })))
}

async fn reload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.service.reload().await;
    Json(json!({ "status": "reloaded" }))
}
