//! Member entity model and DTOs.

use herald_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `members` table.
///
/// **Note:** `password_hash` and `api_key_hash` are never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub id: DbId,
    pub tenant_id: Option<DbId>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub api_key_hash: Option<String>,
    pub is_active: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a member. Hashes are computed by the caller.
#[derive(Debug, Clone)]
pub struct CreateMember {
    pub tenant_id: Option<DbId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub api_key_hash: String,
}
