// src/db/invitation_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique, error::AppError},
    models::{
        auth::UserRole,
        invitation::{Invitation, InvitationPreview, InvitationStatus, PendingInvitation},
    },
};

const INVITATION_COLUMNS: &str =
    "id, email, role, token, status, tenant_id, invited_by_id, expires_at, accepted_at, created_at";

pub struct NewInvitation<'a> {
    pub email: &'a str,
    pub role: UserRole,
    pub token: &'a str,
    pub tenant_id: Uuid,
    pub invited_by_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    pub async fn find_preview_by_token(&self, token: &str) -> Result<Option<InvitationPreview>, AppError> {
        let preview = sqlx::query_as::<_, InvitationPreview>(
            r#"
            SELECT i.email, i.role, i.status, i.expires_at,
                   t.name AS tenant_name, t.slug AS tenant_slug, u.name AS invited_by_name
            FROM invitations i
            JOIN tenants t ON t.id = i.tenant_id
            JOIN users u ON u.id = i.invited_by_id
            WHERE i.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(preview)
    }

    /// Row lock held until the transaction ends; concurrent redemptions queue here.
    pub async fn lock_by_token<'e, E>(&self, executor: E, token: &str) -> Result<Option<Invitation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = $1 FOR UPDATE"
        ))
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(invitation)
    }

    pub async fn has_active_pending<'e, E>(&self, executor: E, tenant_id: Uuid, email: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invitations
                WHERE tenant_id = $1 AND email = $2 AND status = 'pending' AND expires_at > NOW()
            )
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Flips pending-but-past-expiry rows for (tenant, email) so the partial unique index frees up.
    pub async fn expire_stale_for_email<'e, E>(&self, executor: E, tenant_id: Uuid, email: &str) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invitations SET status = 'expired'
            WHERE tenant_id = $1 AND email = $2 AND status = 'pending' AND expires_at <= NOW()
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn create<'e, E>(&self, executor: E, new: NewInvitation<'_>) -> Result<Invitation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            INSERT INTO invitations (email, role, token, tenant_id, invited_by_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.role)
        .bind(new.token)
        .bind(new.tenant_id)
        .bind(new.invited_by_id)
        .bind(new.expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique(e, || {
                AppError::field(
                    "email",
                    "An invitation has already been sent to this email.",
                    "already invited",
                )
            })
        })
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tenant_id: Uuid,
        status: InvitationStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE invitations SET status = $3 WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_accepted<'e, E>(&self, executor: E, id: Uuid, tenant_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invitations SET status = 'accepted', accepted_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Only pending rows of this tenant can be revoked.
    pub async fn revoke(&self, id: Uuid, tenant_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'revoked' WHERE id = $1 AND tenant_id = $2 AND status = 'pending'",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_pending(&self, tenant_id: Uuid) -> Result<Vec<PendingInvitation>, AppError> {
        let rows = sqlx::query_as::<_, PendingInvitation>(
            r#"
            SELECT i.id, i.email, i.role, i.status, i.expires_at, i.created_at,
                   i.invited_by_id, u.name AS invited_by_name, u.email AS invited_by_email
            FROM invitations i
            JOIN users u ON u.id = i.invited_by_id
            WHERE i.tenant_id = $1 AND i.status = 'pending' AND i.expires_at > NOW()
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Maintenance: every tenant's pending-but-expired rows at once.
    pub async fn expire_all_stale(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'expired' WHERE status = 'pending' AND expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
