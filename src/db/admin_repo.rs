// src/db/admin_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique, error::AppError},
    models::admin::{AdminRole, AdminSetupToken, AdminUser},
};

const ADMIN_COLUMNS: &str = "id, email, name, password_hash, role, is_active, failed_login_attempts, \
                             locked_until, last_login_at, created_at, updated_at";

const SETUP_TOKEN_COLUMNS: &str = "id, admin_id, token, expires_at, used_at, created_at";

// Platform operators and their setup tokens.
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE email = $1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn list_all(&self) -> Result<Vec<AdminUser>, AppError> {
        let admins = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(admins)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        email: &str,
        name: &str,
        password_hash: Option<&str>,
        role: AdminRole,
    ) -> Result<AdminUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AdminUser>(&format!(
            r#"
            INSERT INTO admin_users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {ADMIN_COLUMNS}
            "#
        ))
        .bind(email.to_lowercase())
        .bind(name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique(e, || AppError::field("email", "Email already in use.", "taken")))
    }

    /// One statement, so concurrent failures cannot under-count.
    pub async fn record_failed_login(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<Option<AdminUser>, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            r#"
            UPDATE admin_users SET
                failed_login_attempts = failed_login_attempts + 1,
                locked_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ADMIN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn record_successful_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE admin_users SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Locks every primary admin row so two concurrent deletes cannot both pass the guard.
    pub async fn lock_primary_admin_count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM admin_users WHERE role = 'primary_admin' FOR UPDATE")
                .fetch_all(executor)
                .await?;
        Ok(ids.len() as i64)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM admin_users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<AdminUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(admin)
    }

    pub async fn set_password<'e, E>(&self, executor: E, id: Uuid, password_hash: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE admin_users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(())
    }

    // ---
    // Setup tokens
    // ---

    pub async fn create_setup_token<'e, E>(
        &self,
        executor: E,
        admin_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSetupToken, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let setup = sqlx::query_as::<_, AdminSetupToken>(&format!(
            r#"
            INSERT INTO admin_setup_tokens (admin_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {SETUP_TOKEN_COLUMNS}
            "#
        ))
        .bind(admin_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(setup)
    }

    pub async fn find_setup_token(&self, token: &str) -> Result<Option<AdminSetupToken>, AppError> {
        let setup = sqlx::query_as::<_, AdminSetupToken>(&format!(
            "SELECT {SETUP_TOKEN_COLUMNS} FROM admin_setup_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(setup)
    }

    pub async fn lock_setup_token<'e, E>(&self, executor: E, token: &str) -> Result<Option<AdminSetupToken>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let setup = sqlx::query_as::<_, AdminSetupToken>(&format!(
            "SELECT {SETUP_TOKEN_COLUMNS} FROM admin_setup_tokens WHERE token = $1 FOR UPDATE"
        ))
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(setup)
    }

    pub async fn mark_setup_token_used<'e, E>(&self, executor: E, id: Uuid, used_at: DateTime<Utc>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE admin_setup_tokens SET used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(executor)
            .await?;
        Ok(())
    }
}
