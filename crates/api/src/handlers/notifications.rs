//! Dispatch endpoints, authenticated by API key.
//!
//! Email and SMS name their provider explicitly; the provider must belong
//! to the caller's tenant. Push always goes through the tenant's active
//! push provider.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use herald_core::error::CoreError;
use herald_core::types::DbId;
use herald_core::validation::{validate_phone_number, validate_sms_body};
use herald_db::models::notification_log::NotificationLog;
use herald_notify::{EmailRequest, FanOutReport, PushMessage, SmsRequest};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::api_key::ApiKeyAuth;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub provider_id: DbId,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    pub provider_id: DbId,
    pub recipient_phone: String,
    pub body: String,
}

/// Without `device_token` the message fans out to every active device of
/// the caller.
#[derive(Debug, Deserialize)]
pub struct SendPushRequest {
    pub device_token: Option<String>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Result of a push dispatch: one log for a single token, a report for a
/// fan-out.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PushOutcome {
    Single(NotificationLog),
    FanOut(FanOutReport),
}

/// Reject providers outside the caller's tenant as not found.
async fn ensure_tenant_provider(
    state: &AppState,
    identity: &ApiKeyAuth,
    provider_id: DbId,
) -> AppResult<()> {
    let provider = state.providers.get(provider_id).await?;
    if identity.tenant_id() != Some(provider.tenant_id) {
        return Err(CoreError::NotFound {
            entity: "NotificationProvider",
            id: provider_id,
        }
        .into());
    }
    Ok(())
}

/// POST /api/v1/notifications/email
pub async fn send_email(
    identity: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<SendEmailRequest>,
) -> AppResult<Json<DataResponse<NotificationLog>>> {
    ensure_tenant_provider(&state, &identity, input.provider_id).await?;

    let request = EmailRequest {
        recipient_email: input.recipient_email,
        recipient_name: input.recipient_name,
        subject: input.subject,
        body: input.body,
    };
    let log = state
        .email
        .send_email(identity.member.id, input.provider_id, &request, &state.shutdown)
        .await?;
    Ok(Json(DataResponse { data: log }))
}

/// POST /api/v1/notifications/sms
pub async fn send_sms(
    identity: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<SendSmsRequest>,
) -> AppResult<Json<DataResponse<NotificationLog>>> {
    // Malformed input is rejected before the provider lookup.
    validate_phone_number(&input.recipient_phone)?;
    validate_sms_body(&input.body)?;
    ensure_tenant_provider(&state, &identity, input.provider_id).await?;

    let request = SmsRequest {
        recipient_phone: input.recipient_phone,
        body: input.body,
    };
    let log = state
        .sms
        .send_sms(identity.member.id, input.provider_id, &request, &state.shutdown)
        .await?;
    Ok(Json(DataResponse { data: log }))
}

/// POST /api/v1/notifications/push
pub async fn send_push(
    identity: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<SendPushRequest>,
) -> AppResult<Json<DataResponse<PushOutcome>>> {
    let tenant_id = identity
        .tenant_id()
        .ok_or_else(|| AppError::BadRequest("member does not belong to a tenant".into()))?;
    let message = PushMessage {
        title: input.title,
        body: input.body,
        data: input.data,
    };

    let outcome = match input.device_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => PushOutcome::Single(
            state
                .push
                .send_to_token(identity.member.id, tenant_id, token, &message, &state.shutdown)
                .await?,
        ),
        None => PushOutcome::FanOut(
            state
                .push
                .send_to_member(identity.member.id, tenant_id, &message, &state.shutdown)
                .await?,
        ),
    };
    Ok(Json(DataResponse { data: outcome }))
}
