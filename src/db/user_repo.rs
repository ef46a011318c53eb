// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique, error::AppError},
    models::{
        admin::PlatformUser,
        auth::{User, UserRole},
    },
};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, tenant_id, sessions_valid_after, created_at, updated_at";

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: UserRole,
    pub tenant_id: Uuid,
}

// Tenant-scoped identities. Emails are stored lower-cased.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email_in_tenant<'e, E>(
        &self,
        executor: E,
        email: &str,
        tenant_id: Uuid,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND tenant_id = $2"
        ))
        .bind(email.to_lowercase())
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    pub async fn exists_in_tenant(&self, email: &str, tenant_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND tenant_id = $2)",
        )
        .bind(email.to_lowercase())
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create<'e, E>(&self, executor: E, new_user: NewUser<'_>) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, tenant_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_user.email.to_lowercase())
        .bind(new_user.name)
        .bind(new_user.password_hash)
        .bind(new_user.role)
        .bind(new_user.tenant_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique(e, || {
                AppError::field("email", "A user with this email already exists.", "already a member")
            })
        })
    }

    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = $1 ORDER BY created_at ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// The tenant predicate keeps a stale session from editing a moved account.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(tenant_id)
        .bind(name)
        .bind(email.map(str::to_lowercase))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, || AppError::field("email", "This email is already in use.", "taken")))
    }

    /// Also moves the revocation watermark, so every older session token stops working.
    pub async fn set_password<'e, E>(&self, executor: E, user_id: Uuid, password_hash: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2,
                sessions_valid_after = date_trunc('second', NOW()),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(executor)
        .await?;
        Ok(())
    }

    // ---
    // Platform views
    // ---

    pub async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list_platform(&self, limit: i64, offset: i64) -> Result<Vec<PlatformUser>, AppError> {
        let users = sqlx::query_as::<_, PlatformUser>(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.tenant_id,
                   t.name AS tenant_name, t.slug AS tenant_slug,
                   u.created_at, u.updated_at
            FROM users u
            JOIN tenants t ON t.id = u.tenant_id
            ORDER BY u.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn find_platform(&self, id: Uuid) -> Result<Option<PlatformUser>, AppError> {
        let user = sqlx::query_as::<_, PlatformUser>(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.tenant_id,
                   t.name AS tenant_name, t.slug AS tenant_slug,
                   u.created_at, u.updated_at
            FROM users u
            JOIN tenants t ON t.id = u.tenant_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
