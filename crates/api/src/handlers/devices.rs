//! Handlers for the caller's push device registrations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use herald_core::notification::DeviceKind;
use herald_core::validation::validate_device_token;
use herald_db::models::device_token::DeviceToken;
use herald_db::{DeviceTokenStore, StoreError};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub device_token: String,
    pub device_type: String,
}

/// POST /api/v1/devices/register
///
/// Registering a token the caller already holds reactivates it.
pub async fn register_device(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RegisterDeviceRequest>,
) -> AppResult<Json<DataResponse<DeviceToken>>> {
    validate_device_token(&input.device_token)?;
    let kind: DeviceKind = input.device_type.parse().map_err(AppError::BadRequest)?;

    let device = state
        .store
        .upsert_device_token(auth.member_id, &input.device_token, kind)
        .await?;

    tracing::info!(member_id = %auth.member_id, device_type = %kind, "Device token registered");
    Ok(Json(DataResponse { data: device }))
}

/// GET /api/v1/devices
pub async fn list_devices(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<DeviceToken>>>> {
    let devices = state.store.list_device_tokens(auth.member_id).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// DELETE /api/v1/devices/{token}
pub async fn delete_device(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    if !state.store.delete_device_token(auth.member_id, &token).await? {
        return Err(StoreError::NotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}
