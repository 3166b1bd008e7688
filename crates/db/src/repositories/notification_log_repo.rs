//! Repository for the `notification_logs` table.

use herald_core::notification::DeliveryStatus;
use herald_core::types::{new_id, DbId, Timestamp};
use sqlx::PgPool;

use crate::models::notification_log::{
    CreateNotificationLog, GroupCount, LogCounts, LogFilter, NotificationLog,
};

const COLUMNS: &str = "\
    id, member_id, provider_id, channel, recipient_email, recipient_name, \
    recipient_phone, device_token, subject, body, status, error_message, \
    sent_at, created_at, updated_at";

/// Shared `WHERE` clause for [`LogFilter`]; binds `$1..$6`.
const FILTER_CLAUSE: &str = "\
    member_id = $1 \
    AND ($2::TEXT IS NULL OR status = $2) \
    AND ($3::TEXT IS NULL OR channel = $3) \
    AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4) \
    AND ($5::TIMESTAMPTZ IS NULL OR created_at <= $5) \
    AND ($6::TEXT IS NULL \
         OR STRPOS(recipient_email, $6) > 0 \
         OR STRPOS(recipient_phone, $6) > 0)";

/// Shared `WHERE` clause for aggregates; binds `$1..$3`.
const RANGE_CLAUSE: &str = "\
    member_id = $1 \
    AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2) \
    AND ($3::TIMESTAMPTZ IS NULL OR created_at <= $3)";

/// Provides insert, terminal transitions and queries for delivery logs.
pub struct NotificationLogRepo;

impl NotificationLogRepo {
    /// Insert a `PENDING` log row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotificationLog,
    ) -> Result<NotificationLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_logs \
                (id, member_id, provider_id, channel, recipient_email, recipient_name, \
                 recipient_phone, device_token, subject, body, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(new_id())
            .bind(input.member_id)
            .bind(input.provider_id)
            .bind(input.channel.as_str())
            .bind(&input.recipient_email)
            .bind(&input.recipient_name)
            .bind(&input.recipient_phone)
            .bind(&input.device_token)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(DeliveryStatus::Pending.as_str())
            .fetch_one(pool)
            .await
    }

    /// Move a log to `SENT`, stamping `sent_at`.
    pub async fn mark_sent(
        pool: &PgPool,
        id: DbId,
        sent_at: Timestamp,
    ) -> Result<Option<NotificationLog>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_logs SET \
                 status = $2, sent_at = $3, error_message = NULL, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(id)
            .bind(DeliveryStatus::Sent.as_str())
            .bind(sent_at)
            .fetch_optional(pool)
            .await
    }

    /// Move a log to `FAILED` with an error message.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<NotificationLog>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_logs SET \
                 status = $2, error_message = $3, sent_at = NULL, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(id)
            .bind(DeliveryStatus::Failed.as_str())
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }

    /// Find a log by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_logs WHERE id = $1");
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List logs matching `filter`, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &LogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_logs \
             WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC \
             LIMIT $7 OFFSET $8"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(filter.member_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.channel.map(|c| c.as_str()))
            .bind(filter.start)
            .bind(filter.end)
            .bind(filter.recipient.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count logs matching `filter`.
    pub async fn count(pool: &PgPool, filter: &LogFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM notification_logs WHERE {FILTER_CLAUSE}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(filter.member_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.channel.map(|c| c.as_str()))
            .bind(filter.start)
            .bind(filter.end)
            .bind(filter.recipient.as_deref())
            .fetch_one(pool)
            .await
    }

    /// Per-status and per-channel counts of a member's logs in a date range.
    pub async fn counts(
        pool: &PgPool,
        member_id: DbId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<LogCounts, sqlx::Error> {
        let by_status = Self::group_count(pool, "status", member_id, start, end).await?;
        let by_channel = Self::group_count(pool, "channel", member_id, start, end).await?;
        Ok(LogCounts {
            by_status,
            by_channel,
        })
    }

    async fn group_count(
        pool: &PgPool,
        column: &'static str,
        member_id: DbId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<GroupCount>, sqlx::Error> {
        let query = format!(
            "SELECT {column} AS key, COUNT(*)::BIGINT AS count \
             FROM notification_logs \
             WHERE {RANGE_CLAUSE} \
             GROUP BY {column} \
             ORDER BY {column}"
        );
        sqlx::query_as::<_, GroupCount>(&query)
            .bind(member_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}
