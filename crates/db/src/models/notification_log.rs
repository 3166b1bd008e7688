//! Delivery log entity model, DTOs and query types.

use herald_core::notification::{ChannelKind, DeliveryStatus};
use herald_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notification_logs` table: the final outcome of one
/// dispatch.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationLog {
    pub id: DbId,
    pub member_id: DbId,
    pub provider_id: DbId,
    #[sqlx(try_from = "String")]
    pub channel: ChannelKind,
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub device_token: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    #[sqlx(try_from = "String")]
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

/// DTO for inserting a log row. Rows always start `PENDING`.
#[derive(Debug, Clone)]
pub struct CreateNotificationLog {
    pub member_id: DbId,
    pub provider_id: DbId,
    pub channel: ChannelKind,
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub device_token: Option<String>,
    pub subject: Option<String>,
    pub body: String,
}

/// Filters for listing a member's delivery logs.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub member_id: DbId,
    pub status: Option<DeliveryStatus>,
    pub channel: Option<ChannelKind>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    /// Substring matched against recipient email or phone.
    pub recipient: Option<String>,
}

/// One `GROUP BY` bucket of a log aggregate.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// Per-status and per-channel counts for a member's logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogCounts {
    pub by_status: Vec<GroupCount>,
    pub by_channel: Vec<GroupCount>,
}

impl LogCounts {
    pub fn total(&self) -> i64 {
        self.by_status.iter().map(|g| g.count).sum()
    }

    pub fn status_count(&self, status: DeliveryStatus) -> i64 {
        self.by_status
            .iter()
            .find(|g| g.key == status.as_str())
            .map_or(0, |g| g.count)
    }
}
