//! Repository for the `notification_providers` table.
//!
//! Rows are never physically removed; every lookup excludes
//! `is_deleted = TRUE`.

use herald_core::notification::ChannelKind;
use herald_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::provider::{CreateProvider, NotificationProvider, ReplaceProvider};

const COLUMNS: &str = "\
    id, tenant_id, name, kind, config, is_active, is_deleted, deleted_at, \
    created_by, created_at, updated_by, updated_at";

/// Provides CRUD and soft-delete operations for notification providers.
pub struct ProviderRepo;

impl ProviderRepo {
    /// Insert a new active provider, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateProvider,
    ) -> Result<NotificationProvider, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_providers (id, tenant_id, name, kind, config, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationProvider>(&query)
            .bind(new_id())
            .bind(input.tenant_id)
            .bind(&input.name)
            .bind(input.kind.as_str())
            .bind(&input.config)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a provider by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationProvider>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_providers WHERE id = $1 AND is_deleted = FALSE"
        );
        sqlx::query_as::<_, NotificationProvider>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a tenant's providers, newest first. Excludes soft-deleted rows.
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: DbId,
    ) -> Result<Vec<NotificationProvider>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_providers \
             WHERE tenant_id = $1 AND is_deleted = FALSE \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, NotificationProvider>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// The most recently created active provider of `kind` for a tenant.
    pub async fn find_active_by_kind(
        pool: &PgPool,
        tenant_id: DbId,
        kind: ChannelKind,
    ) -> Result<Option<NotificationProvider>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_providers \
             WHERE tenant_id = $1 AND kind = $2 AND is_active = TRUE AND is_deleted = FALSE \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, NotificationProvider>(&query)
            .bind(tenant_id)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Overwrite every mutable field. Returns `None` if absent or deleted.
    pub async fn replace(
        pool: &PgPool,
        id: DbId,
        input: &ReplaceProvider,
    ) -> Result<Option<NotificationProvider>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_providers SET \
                 name = $2, kind = $3, config = $4, is_active = $5, \
                 updated_by = $6, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationProvider>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.kind.as_str())
            .bind(&input.config)
            .bind(input.is_active)
            .bind(input.updated_by)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a provider in a single statement. Returns `true` if a row
    /// was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId, actor: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_providers SET \
                 is_deleted = TRUE, deleted_at = NOW(), updated_by = $2, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(actor)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
