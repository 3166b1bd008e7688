//! Notification provider entity model and DTOs.

use herald_core::notification::ChannelKind;
use herald_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notification_providers` table.
///
/// `config` holds the provider configuration document with its secret
/// fields encrypted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationProvider {
    pub id: DbId,
    pub tenant_id: DbId,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: ChannelKind,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_by: Option<DbId>,
    pub updated_at: Option<Timestamp>,
}

/// DTO for inserting a provider. `config` must already be sealed.
#[derive(Debug, Clone)]
pub struct CreateProvider {
    pub tenant_id: DbId,
    pub name: String,
    pub kind: ChannelKind,
    pub config: serde_json::Value,
    pub created_by: DbId,
}

/// Wholesale replacement of a provider's mutable fields.
#[derive(Debug, Clone)]
pub struct ReplaceProvider {
    pub name: String,
    pub kind: ChannelKind,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub updated_by: DbId,
}
