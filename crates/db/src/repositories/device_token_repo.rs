//! Repository for the `member_device_tokens` table.

use herald_core::notification::DeviceKind;
use herald_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::device_token::DeviceToken;

const COLUMNS: &str = "\
    id, member_id, device_token, device_type, is_active, last_used_at, \
    created_at, updated_at";

/// Provides upsert, listing and deactivation for push device tokens.
pub struct DeviceTokenRepo;

impl DeviceTokenRepo {
    /// Register a token for a member, reactivating and retyping an existing
    /// `(member_id, device_token)` row instead of inserting a duplicate.
    pub async fn upsert(
        pool: &PgPool,
        member_id: DbId,
        device_token: &str,
        device_type: DeviceKind,
    ) -> Result<DeviceToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO member_device_tokens (id, member_id, device_token, device_type, last_used_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT ON CONSTRAINT uq_member_device_tokens_member_token DO UPDATE SET \
                 device_type = EXCLUDED.device_type, \
                 is_active = TRUE, \
                 last_used_at = NOW(), \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(new_id())
            .bind(member_id)
            .bind(device_token)
            .bind(device_type.as_str())
            .fetch_one(pool)
            .await
    }

    /// List every token of a member, newest first.
    pub async fn list_by_member(
        pool: &PgPool,
        member_id: DbId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM member_device_tokens \
             WHERE member_id = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(member_id)
            .fetch_all(pool)
            .await
    }

    /// List a member's active tokens, oldest first.
    pub async fn list_active_by_member(
        pool: &PgPool,
        member_id: DbId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM member_device_tokens \
             WHERE member_id = $1 AND is_active = TRUE \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(member_id)
            .fetch_all(pool)
            .await
    }

    /// Deactivate every registration of a token string. Returns the number
    /// of rows changed.
    pub async fn deactivate_by_token(pool: &PgPool, device_token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE member_device_tokens SET is_active = FALSE, updated_at = NOW() \
             WHERE device_token = $1 AND is_active = TRUE",
        )
        .bind(device_token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Stamp `last_used_at` after a successful delivery.
    pub async fn touch(pool: &PgPool, member_id: DbId, device_token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE member_device_tokens SET last_used_at = NOW() \
             WHERE member_id = $1 AND device_token = $2",
        )
        .bind(member_id)
        .bind(device_token)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a member's registration of a token. Returns `true` if a row was
    /// removed.
    pub async fn delete(pool: &PgPool, member_id: DbId, device_token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM member_device_tokens WHERE member_id = $1 AND device_token = $2",
        )
        .bind(member_id)
        .bind(device_token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
