// src/db/admin_session_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::admin::AdminSession};

const SESSION_COLUMNS: &str = "id, admin_id, token, expires_at, last_activity_at, created_at";

#[derive(Clone)]
pub struct AdminSessionRepository {
    pool: PgPool,
}

impl AdminSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        admin_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
        last_activity_at: DateTime<Utc>,
    ) -> Result<AdminSession, AppError> {
        let session = sqlx::query_as::<_, AdminSession>(&format!(
            r#"
            INSERT INTO admin_sessions (admin_id, token, expires_at, last_activity_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(admin_id)
        .bind(token)
        .bind(expires_at)
        .bind(last_activity_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<AdminSession>, AppError> {
        let session = sqlx::query_as::<_, AdminSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM admin_sessions WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn touch(
        &self,
        id: Uuid,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE admin_sessions SET last_activity_at = $2, expires_at = $3 WHERE id = $1")
            .bind(id)
            .bind(last_activity_at)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM admin_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_by_token(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        let admin_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM admin_sessions WHERE token = $1 RETURNING admin_id")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(admin_id)
    }

    /// Past the hard expiry or idle since before `idle_cutoff`.
    pub async fn delete_expired(&self, now: DateTime<Utc>, idle_cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= $1 OR last_activity_at < $2")
            .bind(now)
            .bind(idle_cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
