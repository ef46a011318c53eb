// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique, error::AppError},
    models::tenancy::{AdminUpdateTenantPayload, PlanDistribution, Tenant, TenantPlan, TenantWithUserCount},
};

const TENANT_COLUMNS: &str = "id, name, slug, plan, is_suspended, created_at, updated_at";

// Tenant directory: the only place a slug turns into a tenant row.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Slug collisions (including a concurrent signup) surface as `Conflict`.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        slug: &str,
        plan: TenantPlan,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO tenants (name, slug, plan) VALUES ($1, $2, $3) RETURNING {TENANT_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .bind(plan)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique(e, || AppError::Conflict("This subdomain is already taken.".into())))
    }

    pub async fn rename(&self, id: Uuid, name: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE tenants SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {TENANT_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    // Fields left as None keep their current value.
    pub async fn update(
        &self,
        id: Uuid,
        changes: &AdminUpdateTenantPayload,
    ) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            UPDATE tenants SET
                name = COALESCE($2, name),
                plan = COALESCE($3, plan),
                is_suspended = COALESCE($4, is_suspended),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.plan)
        .bind(changes.is_suspended)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    /// Cascades to every tenant-owned row.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Platform views
    // ---

    pub async fn list_with_user_counts(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TenantWithUserCount>, AppError> {
        let rows = sqlx::query_as::<_, TenantWithUserCount>(
            r#"
            SELECT
                t.id, t.name, t.slug, t.plan, t.is_suspended,
                (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS user_count,
                t.created_at, t.updated_at
            FROM tenants t
            ORDER BY t.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_with_user_count(&self, id: Uuid) -> Result<Option<TenantWithUserCount>, AppError> {
        let row = sqlx::query_as::<_, TenantWithUserCount>(
            r#"
            SELECT
                t.id, t.name, t.slug, t.plan, t.is_suspended,
                (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS user_count,
                t.created_at, t.updated_at
            FROM tenants t
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn plan_distribution(&self) -> Result<PlanDistribution, AppError> {
        let rows: Vec<(TenantPlan, i64)> =
            sqlx::query_as("SELECT plan, COUNT(*) FROM tenants GROUP BY plan")
                .fetch_all(&self.pool)
                .await?;

        let mut distribution = PlanDistribution::default();
        for (plan, count) in rows {
            match plan {
                TenantPlan::Free => distribution.free = count,
                TenantPlan::Pro => distribution.pro = count,
                TenantPlan::Enterprise => distribution.enterprise = count,
            }
        }
        Ok(distribution)
    }
}
