// src/services/auth.rs

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    common::{
        error::AppError,
        tokens::{generate_token, hash_token},
    },
    db::{
        user_repo::NewUser, AccountRepository, PasswordResetRepository, TenantRepository,
        UserRepository,
    },
    models::{
        account::OAuthProfile,
        auth::{Claims, Identity, UpdateProfilePayload, User, UserRole},
        tenancy::Tenant,
    },
    services::{password::PasswordHasher, scope::Context},
};

pub const SESSION_TTL_DAYS: i64 = 30;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// A validated end-user session: fresh rows plus the claims it was issued with.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub tenant: Tenant,
    pub claims: Claims,
}

impl Session {
    pub fn context(&self) -> Result<Context, AppError> {
        Context::new(self.tenant.id, self.user.id)
    }

    // Role as baked into the token.
    pub fn role(&self) -> UserRole {
        self.claims.role
    }
}

// ---
// Token helpers (pure)
// ---

pub fn encode_session_token(identity: &Identity, secret: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    let expires_at = now + Duration::days(SESSION_TTL_DAYS);
    let claims = Claims {
        sub: identity.user_id,
        tid: identity.tenant_id,
        tslug: identity.tenant_slug.clone(),
        role: identity.role,
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_session_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims)
}

/// Tokens minted before the user's last password change are dead.
pub fn is_revoked(claims: &Claims, sessions_valid_after: DateTime<Utc>) -> bool {
    (claims.iat as i64) < sessions_valid_after.timestamp()
}

/// A session only works on the host of the tenant it was issued for.
pub fn check_host_tenant(claims: &Claims, host_tenant_slug: Option<&str>) -> Result<(), AppError> {
    match host_tenant_slug {
        Some(slug) if slug != claims.tslug => Err(AppError::Forbidden(
            "This session belongs to a different organization.".into(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct AuthService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    account_repo: AccountRepository,
    reset_repo: PasswordResetRepository,
    hasher: PasswordHasher,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        account_repo: AccountRepository,
        reset_repo: PasswordResetRepository,
        hasher: PasswordHasher,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self {
            tenant_repo,
            user_repo,
            account_repo,
            reset_repo,
            hasher,
            jwt_secret,
            pool,
        }
    }

    // ---
    // Sign-in
    // ---

    /// Email + password inside one tenant. Unknown tenant and wrong password look identical.
    pub async fn authorize(&self, email: &str, password: &str, tenant_slug: &str) -> Result<Identity, AppError> {
        let tenant = self
            .tenant_repo
            .find_by_slug(tenant_slug)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if tenant.is_suspended {
            return Err(AppError::TenantSuspended);
        }

        let user = self
            .user_repo
            .find_by_email_in_tenant(&self.pool, email, tenant.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user.password_hash.as_deref().ok_or(AppError::OAuthOnlyUser)?;

        if !self.hasher.verify(password, hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        Ok(Identity {
            user_id: user.id,
            tenant_id: tenant.id,
            role: user.role,
            tenant_slug: tenant.slug,
        })
    }

    /// External sign-in. The tenant comes only from the verified OAuth state.
    pub async fn authorize_oauth(
        &self,
        provider: &str,
        profile: &OAuthProfile,
        tenant_slug: &str,
    ) -> Result<Identity, AppError> {
        let tenant = self
            .tenant_repo
            .find_by_slug(tenant_slug)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        if tenant.is_suspended {
            return Err(AppError::TenantSuspended);
        }

        let email = profile
            .email
            .as_deref()
            .map(str::to_lowercase)
            .ok_or_else(|| AppError::OAuthError("Provider did not return an email address".into()))?;

        let identity = |user: &User| Identity {
            user_id: user.id,
            tenant_id: tenant.id,
            role: user.role,
            tenant_slug: tenant.slug.clone(),
        };

        let mut tx = self.pool.begin().await?;

        // 1. Known external account: it is bound to exactly one tenant.
        if let Some(link) = self
            .account_repo
            .find_by_provider(&mut *tx, provider, &profile.provider_account_id)
            .await?
        {
            let user = self
                .user_repo
                .find_by_id(link.user_id)
                .await?
                .ok_or_else(|| AppError::OAuthError("Linked user no longer exists".into()))?;

            if user.tenant_id != tenant.id {
                tracing::warn!(provider, tenant = %tenant.slug, "External account linked to another tenant");
                return Err(AppError::AccountLinkedToOtherTenant);
            }
            return Ok(identity(&user));
        }

        // 2. Existing user in this tenant: link lazily.
        if let Some(user) = self
            .user_repo
            .find_by_email_in_tenant(&mut *tx, &email, tenant.id)
            .await?
        {
            self.account_repo
                .link(&mut *tx, user.id, provider, &profile.provider_account_id, &profile.tokens)
                .await?;
            tx.commit().await?;
            return Ok(identity(&user));
        }

        // 3. New member without a password, plus the link.
        let name = profile
            .name
            .clone()
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

        let user = self
            .user_repo
            .create(
                &mut *tx,
                NewUser {
                    email: &email,
                    name: &name,
                    password_hash: None,
                    role: UserRole::Member,
                    tenant_id: tenant.id,
                },
            )
            .await?;

        self.account_repo
            .link(&mut *tx, user.id, provider, &profile.provider_account_id, &profile.tokens)
            .await?;

        tx.commit().await?;

        tracing::info!(provider, tenant = %tenant.slug, "Created user from external sign-in");
        Ok(identity(&user))
    }

    pub fn issue_token(&self, identity: &Identity) -> Result<String, AppError> {
        encode_session_token(identity, &self.jwt_secret, Utc::now())
    }

    // ---
    // Session validation
    // ---

    /// Signature and expiry, then fresh user and tenant rows, the revocation
    /// watermark and the host tenant.
    pub async fn validate_session(&self, token: &str, host_tenant_slug: Option<&str>) -> Result<Session, AppError> {
        let claims = decode_session_token(token, &self.jwt_secret)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if user.tenant_id != claims.tid {
            return Err(AppError::InvalidToken);
        }

        if is_revoked(&claims, user.sessions_valid_after) {
            return Err(AppError::Unauthorized("Session has been revoked. Please sign in again.".into()));
        }

        let tenant = self
            .tenant_repo
            .find_by_id(claims.tid)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if tenant.is_suspended {
            return Err(AppError::TenantSuspended);
        }

        check_host_tenant(&claims, host_tenant_slug)?;

        Ok(Session { user, tenant, claims })
    }

    // ---
    // Account management
    // ---

    pub async fn get_user(&self, ctx: &Context) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(ctx.user_id)
            .await?
            .filter(|u| u.tenant_id == ctx.tenant_id)
            .ok_or_else(|| AppError::NotFound("User".into()))
    }

    pub async fn update_profile(&self, ctx: &Context, payload: &UpdateProfilePayload) -> Result<User, AppError> {
        self.user_repo
            .update_profile(ctx.user_id, ctx.tenant_id, payload.name.as_deref(), payload.email.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))
    }

    pub async fn change_password(&self, ctx: &Context, current: &str, new_password: &str) -> Result<(), AppError> {
        let user = self.get_user(ctx).await?;
        let hash = user.password_hash.as_deref().ok_or(AppError::OAuthOnlyUser)?;

        if !self.hasher.verify(current, hash).await? {
            return Err(AppError::field(
                "currentPassword",
                "Current password is incorrect.",
                "incorrect",
            ));
        }

        let new_hash = self.hasher.hash(new_password).await?;
        self.user_repo.set_password(&self.pool, user.id, &new_hash).await?;
        Ok(())
    }

    /// `None` when there is nobody to mail; callers answer the same either way.
    pub async fn request_password_reset(
        &self,
        email: &str,
        tenant_slug: &str,
    ) -> Result<Option<(User, Tenant, String)>, AppError> {
        let Some(tenant) = self.tenant_repo.find_by_slug(tenant_slug).await? else {
            return Ok(None);
        };
        let Some(user) = self
            .user_repo
            .find_by_email_in_tenant(&self.pool, email, tenant.id)
            .await?
        else {
            return Ok(None);
        };

        let token = self.create_reset_token(&user).await?;
        Ok(Some((user, tenant, token)))
    }

    /// Fresh single-use token for `user`; any earlier ones stop working.
    pub async fn create_reset_token(&self, user: &User) -> Result<String, AppError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let mut tx = self.pool.begin().await?;
        self.reset_repo.invalidate_for_user(&mut *tx, user.id).await?;
        self.reset_repo
            .create(&mut *tx, &hash_token(&token), user.id, user.tenant_id, expires_at)
            .await?;
        tx.commit().await?;

        Ok(token)
    }

    /// Consumes the token and sets the password; returns the tenant to sign back into.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<Tenant, AppError> {
        let new_hash = self.hasher.hash(password).await?;

        let mut tx = self.pool.begin().await?;

        let reset = self
            .reset_repo
            .lock_valid(&mut *tx, &hash_token(token))
            .await?
            .ok_or_else(|| AppError::field("token", "Invalid or expired reset link.", "invalid"))?;

        self.user_repo.set_password(&mut *tx, reset.user_id, &new_hash).await?;
        self.reset_repo.mark_used(&mut *tx, reset.id).await?;

        tx.commit().await?;

        self.tenant_repo
            .find_by_id(reset.tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)
    }
}
