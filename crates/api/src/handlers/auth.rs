//! Handlers for member registration, login and API-key management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use herald_core::api_keys::generate_api_key;
use herald_core::error::CoreError;
use herald_core::types::DbId;
use herald_db::models::member::{CreateMember, Member};
use herald_db::models::tenant::Tenant;
use herald_db::{MemberStore, TenantStore};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::api_key::ApiKeyAuth;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const INVALID_LOGIN: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub tenant_id: Option<DbId>,
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub tenant_id: Option<DbId>,
}

/// A member together with a freshly issued API key. The key is never
/// retrievable again.
#[derive(Debug, Serialize)]
pub struct IssuedKey {
    pub member: Member,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub member: Member,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub member: Member,
    pub tenant: Option<Tenant>,
}

#[derive(Debug, Serialize)]
pub struct KeyVerification {
    pub valid: bool,
    pub member: Member,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/register
///
/// Create a member and return it with its first API key.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<IssuedKey>>)> {
    let name = input.name.trim();
    let email = input.email.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is invalid".into()));
    }
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(AppError::BadRequest)?;

    if let Some(tenant_id) = input.tenant_id {
        state
            .store
            .find_tenant(tenant_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Tenant",
                id: tenant_id,
            })?;
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let key = generate_api_key();

    let member = state
        .store
        .create_member(&CreateMember {
            tenant_id: input.tenant_id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            api_key_hash: key.hash,
        })
        .await?;

    tracing::info!(member_id = %member.id, tenant_id = ?member.tenant_id, "Member registered");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IssuedKey {
                member,
                api_key: key.plaintext,
            },
        }),
    ))
}

/// POST /api/v1/login
///
/// Authenticate with email + password and receive an access token. When a
/// tenant is given it must be the member's tenant.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let member = state
        .store
        .find_member_by_email(input.email.trim())
        .await?
        .ok_or_else(|| CoreError::unauthorized(INVALID_LOGIN))?;

    if input.tenant_id.is_some() && input.tenant_id != member.tenant_id {
        return Err(CoreError::unauthorized(INVALID_LOGIN).into());
    }

    let password_valid = verify_password(&input.password, &member.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(CoreError::unauthorized(INVALID_LOGIN).into());
    }

    if !member.is_active {
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }

    let access_token = generate_access_token(member.id, member.tenant_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(member_id = %member.id, "Member logged in");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        member,
    }))
}

/// GET /api/v1/profile
pub async fn profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let member = state
        .store
        .find_member(auth.member_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Member",
            id: auth.member_id,
        })?;
    let tenant = match member.tenant_id {
        Some(tenant_id) => state.store.find_tenant(tenant_id).await?,
        None => None,
    };

    Ok(Json(DataResponse {
        data: Profile { member, tenant },
    }))
}

/// POST /api/v1/auth/regenerate-key
///
/// Replace the member's API key. The old key stops resolving at once,
/// except where an identity cache entry for it has not yet expired.
pub async fn regenerate_key(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<IssuedKey>>> {
    let key = generate_api_key();
    let member = state
        .store
        .set_member_api_key_hash(auth.member_id, &key.hash)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Member",
            id: auth.member_id,
        })?;

    tracing::info!(member_id = %member.id, "API key regenerated");
    Ok(Json(DataResponse {
        data: IssuedKey {
            member,
            api_key: key.plaintext,
        },
    }))
}

/// GET /api/v1/auth/verify-key
pub async fn verify_key(identity: ApiKeyAuth) -> Json<KeyVerification> {
    Json(KeyVerification {
        valid: true,
        member: identity.member,
        tenant: identity.tenant,
    })
}
