// src/services/platform_service.rs

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        tokens::{generate_token, hash_token},
    },
    db::{AuditRepository, PasswordResetRepository, TenantRepository, UserRepository},
    models::{
        admin::{
            AdminUser, AuditAction, AuditActor, AuditLogEntry, AuditTarget, DashboardStats, Page,
            PageQuery, Pagination, PlatformUser,
        },
        tenancy::{AdminUpdateTenantPayload, Tenant, TenantWithUserCount},
    },
    services::{audit::AuditLogger, auth::RESET_TOKEN_TTL_HOURS},
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_AUDIT_PAGE_SIZE: i64 = 50;

/// Cross-tenant operations for the admin panel. Reads of a single record and
/// every write leave an audit entry.
#[derive(Clone)]
pub struct PlatformService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    reset_repo: PasswordResetRepository,
    audit_repo: AuditRepository,
    audit: AuditLogger,
    pool: PgPool,
}

impl PlatformService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        reset_repo: PasswordResetRepository,
        audit_repo: AuditRepository,
        audit: AuditLogger,
        pool: PgPool,
    ) -> Self {
        Self {
            tenant_repo,
            user_repo,
            reset_repo,
            audit_repo,
            audit,
            pool,
        }
    }

    // ---
    // Tenants
    // ---

    pub async fn list_tenants(&self, query: &PageQuery) -> Result<Page<TenantWithUserCount>, AppError> {
        let (page, limit, offset) = query.resolve(DEFAULT_PAGE_SIZE);
        let items = self.tenant_repo.list_with_user_counts(limit, offset).await?;
        let total = self.tenant_repo.count().await?;
        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn get_tenant(&self, actor: &AdminUser, id: Uuid) -> Result<TenantWithUserCount, AppError> {
        let tenant = self
            .tenant_repo
            .find_with_user_count(id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        self.audit
            .record(
                &AuditActor::from(actor),
                AuditAction::TenantView,
                Some((AuditTarget::Tenant, id.to_string())),
                Some(json!({ "slug": tenant.slug })),
            )
            .await;

        Ok(tenant)
    }

    /// Suspension changes get their own entry on top of `tenant.update`.
    pub async fn update_tenant(
        &self,
        actor: &AdminUser,
        id: Uuid,
        changes: &AdminUpdateTenantPayload,
    ) -> Result<Tenant, AppError> {
        let tenant = self
            .tenant_repo
            .update(id, changes)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let actor = AuditActor::from(actor);
        let target = || Some((AuditTarget::Tenant, id.to_string()));

        self.audit
            .record(&actor, AuditAction::TenantUpdate, target(), serde_json::to_value(changes).ok())
            .await;

        if let Some(suspended) = changes.is_suspended {
            let action = if suspended {
                AuditAction::TenantSuspend
            } else {
                AuditAction::TenantUnsuspend
            };
            self.audit
                .record(&actor, action, target(), Some(json!({ "slug": tenant.slug })))
                .await;
        }

        Ok(tenant)
    }

    pub async fn delete_tenant(&self, actor: &AdminUser, id: Uuid) -> Result<(), AppError> {
        let tenant = self
            .tenant_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        if !self.tenant_repo.delete(id).await? {
            return Err(AppError::TenantNotFound);
        }

        tracing::warn!(tenant = %tenant.slug, admin = %actor.email, "Tenant deleted");

        self.audit
            .record(
                &AuditActor::from(actor),
                AuditAction::TenantDelete,
                Some((AuditTarget::Tenant, id.to_string())),
                Some(json!({ "name": tenant.name, "slug": tenant.slug })),
            )
            .await;

        Ok(())
    }

    // ---
    // Users
    // ---

    pub async fn list_users(&self, query: &PageQuery) -> Result<Page<PlatformUser>, AppError> {
        let (page, limit, offset) = query.resolve(DEFAULT_PAGE_SIZE);
        let items = self.user_repo.list_platform(limit, offset).await?;
        let total = self.user_repo.count().await?;
        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn get_user(&self, actor: &AdminUser, id: Uuid) -> Result<PlatformUser, AppError> {
        let user = self
            .user_repo
            .find_platform(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        self.audit
            .record(
                &AuditActor::from(actor),
                AuditAction::UserView,
                Some((AuditTarget::User, id.to_string())),
                Some(json!({ "email": user.email, "tenantSlug": user.tenant_slug })),
            )
            .await;

        Ok(user)
    }

    /// Issues a reset link on the user's behalf; the raw token goes back for mailing.
    pub async fn reset_user_password(&self, actor: &AdminUser, id: Uuid) -> Result<(PlatformUser, String), AppError> {
        let user = self
            .user_repo
            .find_platform(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let mut tx = self.pool.begin().await?;
        self.reset_repo.invalidate_for_user(&mut *tx, user.id).await?;
        self.reset_repo
            .create(&mut *tx, &hash_token(&token), user.id, user.tenant_id, expires_at)
            .await?;
        tx.commit().await?;

        self.audit
            .record(
                &AuditActor::from(actor),
                AuditAction::UserResetPassword,
                Some((AuditTarget::User, id.to_string())),
                Some(json!({ "email": user.email })),
            )
            .await;

        Ok((user, token))
    }

    // ---
    // Audit log & stats
    // ---

    pub async fn list_audit_logs(&self, query: &PageQuery) -> Result<Page<AuditLogEntry>, AppError> {
        let (page, limit, offset) = query.resolve(DEFAULT_AUDIT_PAGE_SIZE);
        let items = self.audit_repo.list(limit, offset).await?;
        let total = self.audit_repo.count().await?;
        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn stats(&self) -> Result<DashboardStats, AppError> {
        Ok(DashboardStats {
            total_tenants: self.tenant_repo.count().await?,
            total_users: self.user_repo.count().await?,
            plan_distribution: self.tenant_repo.plan_distribution().await?,
        })
    }
}
