//! Handlers for tenant notification providers.
//!
//! Every route is scoped to the caller's tenant. A provider of another
//! tenant is reported as not found.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::provider_config::ConfigCheck;
use herald_core::types::DbId;
use herald_db::models::provider::NotificationProvider;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for creating or replacing a provider. Secrets in `config`
/// arrive in plaintext and are encrypted before storage.
#[derive(Debug, Deserialize)]
pub struct ProviderInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub config: serde_json::Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ProviderInput {
    fn validated_name(&self) -> Result<&str, CoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("name is required"));
        }
        Ok(name)
    }
}

/// Fetch a provider and check it belongs to the caller's tenant.
async fn owned_provider(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
) -> AppResult<NotificationProvider> {
    let tenant_id = auth.require_tenant()?;
    let provider = state.providers.get(id).await?;
    if provider.tenant_id != tenant_id {
        return Err(CoreError::NotFound {
            entity: "NotificationProvider",
            id,
        }
        .into());
    }
    Ok(provider)
}

/// POST /api/v1/providers
pub async fn create_provider(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ProviderInput>,
) -> AppResult<(StatusCode, Json<DataResponse<NotificationProvider>>)> {
    let tenant_id = auth.require_tenant()?;
    let name = input.validated_name()?;

    let mut provider = state
        .providers
        .create(tenant_id, name, input.kind, &input.config, auth.member_id)
        .await?;
    if !input.is_active {
        provider = state
            .providers
            .update(provider.id, name, input.kind, &input.config, false, auth.member_id)
            .await?;
    }
    if provider.kind == ChannelKind::Push {
        state.push.forget_tenant(tenant_id).await;
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: provider })))
}

/// GET /api/v1/providers
pub async fn list_providers(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<NotificationProvider>>>> {
    let tenant_id = auth.require_tenant()?;
    let providers = state.providers.list_by_tenant(tenant_id).await?;
    Ok(Json(DataResponse { data: providers }))
}

/// GET /api/v1/providers/{id}
pub async fn get_provider(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<NotificationProvider>>> {
    let provider = owned_provider(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: provider }))
}

/// PUT /api/v1/providers/{id}
///
/// Full replacement: name, type, config and active flag are all overwritten.
pub async fn update_provider(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ProviderInput>,
) -> AppResult<Json<DataResponse<NotificationProvider>>> {
    let name = input.validated_name()?;
    let current = owned_provider(&state, &auth, id).await?;

    let provider = state
        .providers
        .update(id, name, input.kind, &input.config, input.is_active, auth.member_id)
        .await?;
    if current.kind == ChannelKind::Push || provider.kind == ChannelKind::Push {
        state.push.forget_tenant(provider.tenant_id).await;
    }
    Ok(Json(DataResponse { data: provider }))
}

/// DELETE /api/v1/providers/{id}
pub async fn delete_provider(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let provider = owned_provider(&state, &auth, id).await?;
    state.providers.delete(id, auth.member_id).await?;
    if provider.kind == ChannelKind::Push {
        state.push.forget_tenant(provider.tenant_id).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/providers/{id}/test
///
/// Report whether the stored configuration is complete. An incomplete
/// configuration is a 200 with `valid: false`.
pub async fn test_provider(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConfigCheck>>> {
    owned_provider(&state, &auth, id).await?;
    let check = state.providers.test_config(id).await?;
    Ok(Json(DataResponse { data: check }))
}
