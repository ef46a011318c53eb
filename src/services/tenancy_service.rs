// src/services/tenancy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{user_repo::NewUser, TenantRepository, UserRepository},
    models::{
        auth::{SignupPayload, User, UserRole},
        tenancy::{validate_tenant_slug, Tenant, TenantPlan},
    },
    services::{
        password::PasswordHasher,
        scope::{validate_context, Context},
    },
};

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    hasher: PasswordHasher,
    pool: PgPool,
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        hasher: PasswordHasher,
        pool: PgPool,
    ) -> Self {
        Self {
            tenant_repo,
            user_repo,
            hasher,
            pool,
        }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        self.tenant_repo.find_by_slug(slug).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        self.tenant_repo.find_by_id(id).await
    }

    /// Format, reserved words, then the directory.
    pub async fn is_slug_available(&self, slug: &str) -> Result<bool, AppError> {
        if validate_tenant_slug(slug).is_err() {
            return Ok(false);
        }
        Ok(!self.tenant_repo.slug_exists(slug).await?)
    }

    /// New organization on the free plan with its first user as owner, atomically.
    pub async fn signup(&self, payload: &SignupPayload) -> Result<(Tenant, User), AppError> {
        if self.tenant_repo.slug_exists(&payload.tenant_slug).await? {
            return Err(AppError::Conflict("This subdomain is already taken.".into()));
        }

        // Hashing stays outside the transaction.
        let password_hash = self.hasher.hash(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        let tenant = self
            .tenant_repo
            .create(&mut *tx, &payload.tenant_name, &payload.tenant_slug, TenantPlan::Free)
            .await?;

        let owner = self
            .user_repo
            .create(
                &mut *tx,
                NewUser {
                    email: &payload.email,
                    name: &payload.name,
                    password_hash: Some(&password_hash),
                    role: UserRole::Owner,
                    tenant_id: tenant.id,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(tenant = %tenant.slug, "New tenant signed up");
        Ok((tenant, owner))
    }

    pub async fn list_members(&self, ctx: &Context) -> Result<Vec<User>, AppError> {
        validate_context(ctx)?;
        self.user_repo.list_by_tenant(ctx.tenant_id).await
    }

    pub async fn rename(&self, tenant_id: Uuid, name: &str) -> Result<Tenant, AppError> {
        self.tenant_repo
            .rename(tenant_id, name)
            .await?
            .ok_or(AppError::TenantNotFound)
    }
}
