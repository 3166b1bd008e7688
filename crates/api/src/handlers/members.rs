//! Member administration within the caller's tenant.
//!
//! Members of other tenants are reported as not found.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use herald_core::error::CoreError;
use herald_core::types::DbId;
use herald_db::models::member::Member;
use herald_db::MemberStore;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

async fn tenant_member(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<Member> {
    let tenant_id = auth.require_tenant()?;
    state
        .store
        .find_member(id)
        .await?
        .filter(|member| member.tenant_id == Some(tenant_id))
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Member",
                id,
            }
            .into()
        })
}

/// GET /api/v1/users
pub async fn list_members(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Member>>>> {
    let tenant_id = auth.require_tenant()?;
    let members = state.store.list_members_by_tenant(tenant_id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// GET /api/v1/user/{id}
pub async fn get_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Member>>> {
    let member = tenant_member(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: member }))
}

/// DELETE /api/v1/user/{id}
///
/// Soft delete. The member can no longer log in, and its API key stops
/// resolving immediately.
pub async fn delete_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    tenant_member(&state, &auth, id).await?;
    if !state.store.soft_delete_member(id).await? {
        return Err(CoreError::NotFound {
            entity: "Member",
            id,
        }
        .into());
    }
    let evicted = state.identity.evict_member(id).await;

    tracing::info!(member_id = %id, deleted_by = %auth.member_id, evicted, "Member deleted");
    Ok(StatusCode::NO_CONTENT)
}
