//! Repository for the `members` table.

use herald_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::member::{CreateMember, Member};

const COLUMNS: &str = "\
    id, tenant_id, name, email, password_hash, api_key_hash, \
    is_active, deleted_at, created_at, updated_at";

/// Provides CRUD operations for members.
pub struct MemberRepo;

impl MemberRepo {
    /// Insert a new member, returning the created row.
    ///
    /// Fails with a `uq_members_email` unique violation if the email is taken.
    pub async fn create(pool: &PgPool, input: &CreateMember) -> Result<Member, sqlx::Error> {
        let query = format!(
            "INSERT INTO members (id, tenant_id, name, email, password_hash, api_key_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(new_id())
            .bind(input.tenant_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.api_key_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a member by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Member>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM members WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a tenant's members, oldest first. Excludes soft-deleted rows.
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: DbId,
    ) -> Result<Vec<Member>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM members \
             WHERE tenant_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// Find a member by email (case-insensitive). Excludes soft-deleted rows.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Member>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM members \
             WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find an active, non-deleted member by the SHA-256 hash of its API key.
    pub async fn find_active_by_api_key_hash(
        pool: &PgPool,
        api_key_hash: &str,
    ) -> Result<Option<Member>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM members \
             WHERE api_key_hash = $1 AND is_active = TRUE AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(api_key_hash)
            .fetch_optional(pool)
            .await
    }

    /// Replace a member's API key hash. Returns `None` if the member is gone.
    pub async fn set_api_key_hash(
        pool: &PgPool,
        id: DbId,
        api_key_hash: &str,
    ) -> Result<Option<Member>, sqlx::Error> {
        let query = format!(
            "UPDATE members SET api_key_hash = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .bind(api_key_hash)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a member. Returns `false` if it was absent or already deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE members SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
