//! Repository for the `tenants` table.

use herald_core::types::{new_id, DbId};
use sqlx::PgPool;

use crate::models::tenant::{CreateTenant, Tenant};

const COLUMNS: &str = "id, name, is_active, deleted_at, created_at, updated_at";

/// Provides CRUD operations for tenants.
pub struct TenantRepo;

impl TenantRepo {
    /// Insert a new tenant, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTenant) -> Result<Tenant, sqlx::Error> {
        let query = format!(
            "INSERT INTO tenants (id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tenant>(&query)
            .bind(new_id())
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Find a tenant by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Tenant>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM tenants WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
