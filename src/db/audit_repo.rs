// src/db/audit_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::admin::{AuditAction, AuditActor, AuditLogEntry, AuditTarget},
};

const AUDIT_COLUMNS: &str = "id, admin_id, admin_email, action, target_type, target_id, details, created_at";

// Append-only: there is no update or delete here.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        actor: &AuditActor,
        action: AuditAction,
        target: Option<(AuditTarget, String)>,
        details: Option<serde_json::Value>,
    ) -> Result<AuditLogEntry, AppError> {
        let (target_type, target_id) = match target {
            Some((kind, id)) => (Some(kind.as_str()), Some(id)),
            None => (None, None),
        };

        let entry = sqlx::query_as::<_, AuditLogEntry>(&format!(
            r#"
            INSERT INTO audit_logs (admin_id, admin_email, action, target_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {AUDIT_COLUMNS}
            "#
        ))
        .bind(actor.admin_id)
        .bind(&actor.admin_email)
        .bind(action.as_str())
        .bind(target_type)
        .bind(target_id)
        .bind(details)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AuditLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
