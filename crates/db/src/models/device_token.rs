//! Push device token entity model.

use herald_core::notification::DeviceKind;
use herald_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `member_device_tokens` table.
///
/// Unique per `(member_id, device_token)`; the same token may be registered
/// under several members.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceToken {
    pub id: DbId,
    pub member_id: DbId,
    pub device_token: String,
    #[sqlx(try_from = "String")]
    pub device_type: DeviceKind,
    pub is_active: bool,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
