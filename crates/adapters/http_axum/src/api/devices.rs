//! JSON REST handlers for devices.
//!
//! Handlers are thin: every rule lives in the registry, and the body is
//! handed over as a loosely-typed [`DevicePayload`] so that shape problems
//! surface as the registry's own validation errors.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use fleetsync_app::ports::DeviceStore;
use fleetsync_domain::device::{Device, DevicePayload};

use crate::api::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Envelope<Vec<Device>>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and update endpoints.
pub enum DeviceResponse {
    Ok(Json<Envelope<Device>>),
}

impl IntoResponse for DeviceResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Envelope<Device>>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    Deleted(Json<Envelope<Device>>),
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Deleted(json) => json.into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<ListResponse, ApiError>
where
    S: DeviceStore + Send + Sync + 'static,
{
    let devices = state.registry.list().await?;
    Ok(ListResponse::Ok(Json(Envelope::success(devices))))
}

/// `GET /api/devices/{id}`
pub async fn get<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<DeviceResponse, ApiError>
where
    S: DeviceStore + Send + Sync + 'static,
{
    let device = state.registry.get(&id).await?;
    Ok(DeviceResponse::Ok(Json(Envelope::success(device))))
}

/// `POST /api/devices`
pub async fn create<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<DevicePayload>, JsonRejection>,
) -> Result<CreateResponse, ApiError>
where
    S: DeviceStore + Send + Sync + 'static,
{
    let Json(payload) = payload?;
    let created = state.registry.create(payload).await?;
    Ok(CreateResponse::Created(Json(Envelope::success(created))))
}

/// `PUT /api/devices/{id}`
pub async fn update<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<DevicePayload>, JsonRejection>,
) -> Result<DeviceResponse, ApiError>
where
    S: DeviceStore + Send + Sync + 'static,
{
    let Json(payload) = payload?;
    let updated = state.registry.update(&id, payload).await?;
    Ok(DeviceResponse::Ok(Json(Envelope::success(updated))))
}

/// `DELETE /api/devices/{id}`
pub async fn delete<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    S: DeviceStore + Send + Sync + 'static,
{
    let removed = state.registry.delete(&id).await?;
    Ok(DeleteResponse::Deleted(Json(Envelope::with_message(
        "Device deleted successfully",
        removed,
    ))))
}
