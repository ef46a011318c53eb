// src/db/password_reset_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::account::PasswordResetToken};

const RESET_COLUMNS: &str = "id, token_hash, user_id, tenant_id, expires_at, used_at, created_at";

#[derive(Clone)]
pub struct PasswordResetRepository {
    pool: PgPool,
}

impl PasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Burns every outstanding token of the user.
    pub async fn invalidate_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        token_hash: &str,
        user_id: Uuid,
        tenant_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let token = sqlx::query_as::<_, PasswordResetToken>(&format!(
            r#"
            INSERT INTO password_reset_tokens (token_hash, user_id, tenant_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {RESET_COLUMNS}
            "#
        ))
        .bind(token_hash)
        .bind(user_id)
        .bind(tenant_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(token)
    }

    /// Unused, unexpired token, row-locked for the rest of the transaction.
    pub async fn lock_valid<'e, E>(&self, executor: E, token_hash: &str) -> Result<Option<PasswordResetToken>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let token = sqlx::query_as::<_, PasswordResetToken>(&format!(
            r#"
            SELECT {RESET_COLUMNS} FROM password_reset_tokens
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            FOR UPDATE
            "#
        ))
        .bind(token_hash)
        .fetch_optional(executor)
        .await?;
        Ok(token)
    }

    pub async fn mark_used<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_stale(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE used_at IS NOT NULL OR expires_at < NOW()",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
