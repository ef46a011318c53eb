// src/services/admin_auth.rs

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, tokens::generate_token},
    db::{AdminRepository, AdminSessionRepository},
    models::admin::{
        AdminRole, AdminSession, AdminSetupToken, AdminUser, AuditAction, AuditActor, AuditTarget,
        CreateAdminPayload, SetupTokenInfo,
    },
    services::{audit::AuditLogger, password::PasswordHasher},
};

pub const MAX_FAILED_ATTEMPTS: i32 = 5;
pub const LOCKOUT_MINUTES: i64 = 30;
pub const SESSION_MINUTES: i64 = 30;
pub const INACTIVITY_MINUTES: i64 = 30;
pub const SETUP_TOKEN_HOURS: i64 = 48;

// ---
// Decisions (pure, clock passed in)
// ---

pub fn is_locked(admin: &AdminUser, now: DateTime<Utc>) -> bool {
    admin.locked_until.is_some_and(|until| until > now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
    Idle,
}

pub fn session_state(session: &AdminSession, now: DateTime<Utc>) -> SessionState {
    if session.expires_at <= now {
        SessionState::Expired
    } else if now - session.last_activity_at > Duration::minutes(INACTIVITY_MINUTES) {
        SessionState::Idle
    } else {
        SessionState::Active
    }
}

/// New (last_activity_at, expires_at) after a request at `now`.
pub fn slide_session(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::minutes(SESSION_MINUTES))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupTokenState {
    Valid,
    Used,
    Expired,
}

pub fn setup_token_state(token: &AdminSetupToken, now: DateTime<Utc>) -> SetupTokenState {
    if token.used_at.is_some() {
        SetupTokenState::Used
    } else if token.expires_at <= now {
        SetupTokenState::Expired
    } else {
        SetupTokenState::Valid
    }
}

fn setup_token_error(state: SetupTokenState) -> Option<AppError> {
    match state {
        SetupTokenState::Valid => None,
        SetupTokenState::Used => Some(AppError::field(
            "token",
            "This setup link has already been used.",
            "already used",
        )),
        SetupTokenState::Expired => Some(AppError::field("token", "This setup link has expired.", "expired")),
    }
}

fn already_set_up() -> AppError {
    AppError::field("token", "This account has already been set up.", "already set up")
}

#[derive(Clone)]
pub struct AdminAuthService {
    admin_repo: AdminRepository,
    session_repo: AdminSessionRepository,
    audit: AuditLogger,
    hasher: PasswordHasher,
    pool: PgPool,
}

impl AdminAuthService {
    pub fn new(
        admin_repo: AdminRepository,
        session_repo: AdminSessionRepository,
        audit: AuditLogger,
        hasher: PasswordHasher,
        pool: PgPool,
    ) -> Self {
        Self {
            admin_repo,
            session_repo,
            audit,
            hasher,
            pool,
        }
    }

    // ---
    // Sessions
    // ---

    pub async fn login(&self, email: &str, password: &str) -> Result<(AdminUser, AdminSession), AppError> {
        let now = Utc::now();

        let admin = self
            .admin_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if is_locked(&admin, now) {
            return Err(AppError::Locked);
        }

        if !admin.is_active {
            return Err(AppError::Deactivated);
        }

        // Setup still pending counts as a wrong password.
        let valid = match admin.password_hash.as_deref() {
            Some(hash) => self.hasher.verify(password, hash).await?,
            None => false,
        };

        if !valid {
            let lock_until = now + Duration::minutes(LOCKOUT_MINUTES);
            let updated = self
                .admin_repo
                .record_failed_login(admin.id, MAX_FAILED_ATTEMPTS, lock_until)
                .await?;
            if let Some(updated) = updated.filter(|a| is_locked(a, now)) {
                tracing::warn!(
                    admin_id = %updated.id,
                    attempts = updated.failed_login_attempts,
                    "Admin account locked after repeated failures"
                );
            }
            return Err(AppError::InvalidCredentials);
        }

        self.admin_repo.record_successful_login(admin.id).await?;

        let (last_activity_at, expires_at) = slide_session(now);
        let session = self
            .session_repo
            .create(admin.id, &generate_token(), expires_at, last_activity_at)
            .await?;

        self.audit
            .record(&AuditActor::from(&admin), AuditAction::AdminLogin, None, None)
            .await;

        Ok((admin, session))
    }

    /// `None` for anything that is not a live session of an active admin.
    /// A live one has both timers pushed forward.
    pub async fn validate(&self, token: &str) -> Result<Option<AdminUser>, AppError> {
        let now = Utc::now();

        let Some(session) = self.session_repo.find_by_token(token).await? else {
            return Ok(None);
        };

        if session_state(&session, now) != SessionState::Active {
            self.session_repo.delete_by_id(session.id).await?;
            return Ok(None);
        }

        let admin = match self.admin_repo.find_by_id(session.admin_id).await? {
            Some(admin) if admin.is_active => admin,
            _ => return Ok(None),
        };

        let (last_activity_at, expires_at) = slide_session(now);
        self.session_repo.touch(session.id, last_activity_at, expires_at).await?;

        Ok(Some(admin))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        let Some(admin_id) = self.session_repo.delete_by_token(token).await? else {
            return Ok(());
        };

        if let Some(admin) = self.admin_repo.find_by_id(admin_id).await? {
            self.audit
                .record(&AuditActor::from(&admin), AuditAction::AdminLogout, None, None)
                .await;
        }
        Ok(())
    }

    // ---
    // Admin management (primary admins only)
    // ---

    pub async fn list_admins(&self) -> Result<Vec<AdminUser>, AppError> {
        self.admin_repo.list_all().await
    }

    /// Without a password the admin gets a setup token (returned for mailing).
    pub async fn create_admin(
        &self,
        actor: &AdminUser,
        payload: &CreateAdminPayload,
    ) -> Result<(AdminUser, Option<String>), AppError> {
        require_primary(actor)?;

        let email = payload.email.trim().to_lowercase();

        let (admin, setup_token) = match payload.password.as_deref() {
            Some(password) => {
                let hash = self.hasher.hash(password).await?;
                let admin = self
                    .admin_repo
                    .create(&self.pool, &email, payload.name.trim(), Some(&hash), payload.role)
                    .await?;
                (admin, None)
            }
            None => {
                let token = generate_token();
                let mut tx = self.pool.begin().await?;
                let admin = self
                    .admin_repo
                    .create(&mut *tx, &email, payload.name.trim(), None, payload.role)
                    .await?;
                self.admin_repo
                    .create_setup_token(
                        &mut *tx,
                        admin.id,
                        &token,
                        Utc::now() + Duration::hours(SETUP_TOKEN_HOURS),
                    )
                    .await?;
                tx.commit().await?;
                (admin, Some(token))
            }
        };

        self.audit
            .record(
                &AuditActor::from(actor),
                AuditAction::AdminCreate,
                Some((AuditTarget::Admin, admin.id.to_string())),
                Some(json!({ "email": admin.email, "role": admin.role })),
            )
            .await;

        Ok((admin, setup_token))
    }

    /// Self-deletion and removing the last primary admin are refused.
    pub async fn delete_admin(&self, actor: &AdminUser, id: Uuid) -> Result<(), AppError> {
        require_primary(actor)?;

        if actor.id == id {
            return Err(AppError::field("id", "You cannot delete your own account.", "self"));
        }

        let mut tx = self.pool.begin().await?;

        let target = self
            .admin_repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Admin".into()))?;

        if target.role == AdminRole::PrimaryAdmin {
            let primaries = self.admin_repo.lock_primary_admin_count(&mut *tx).await?;
            if primaries <= 1 {
                return Err(AppError::field(
                    "id",
                    "Cannot delete the last primary admin.",
                    "last primary admin",
                ));
            }
        }

        self.admin_repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        self.audit
            .record(
                &AuditActor::from(actor),
                AuditAction::AdminDelete,
                Some((AuditTarget::Admin, id.to_string())),
                Some(json!({ "email": target.email })),
            )
            .await;

        Ok(())
    }

    // ---
    // Setup tokens
    // ---

    pub async fn validate_setup_token(&self, token: &str) -> Result<SetupTokenInfo, AppError> {
        let setup = self
            .admin_repo
            .find_setup_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Setup token".into()))?;

        if let Some(err) = setup_token_error(setup_token_state(&setup, Utc::now())) {
            return Err(err);
        }

        let admin = self
            .admin_repo
            .find_by_id(setup.admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Admin".into()))?;

        if admin.password_hash.is_some() {
            return Err(already_set_up());
        }

        Ok(SetupTokenInfo {
            email: admin.email,
            name: admin.name,
        })
    }

    pub async fn complete_setup(&self, token: &str, password: &str) -> Result<AdminUser, AppError> {
        self.complete_setup_at(token, password, Utc::now()).await
    }

    /// Single use: the token row stays locked until the password is set.
    pub async fn complete_setup_at(
        &self,
        token: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminUser, AppError> {
        let hash = self.hasher.hash(password).await?;

        let mut tx = self.pool.begin().await?;

        let setup = self
            .admin_repo
            .lock_setup_token(&mut *tx, token)
            .await?
            .ok_or_else(|| AppError::NotFound("Setup token".into()))?;

        if let Some(err) = setup_token_error(setup_token_state(&setup, now)) {
            return Err(err);
        }

        let admin = self
            .admin_repo
            .lock_by_id(&mut *tx, setup.admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Admin".into()))?;

        if admin.password_hash.is_some() {
            return Err(already_set_up());
        }

        self.admin_repo.set_password(&mut *tx, admin.id, &hash).await?;
        self.admin_repo.mark_setup_token_used(&mut *tx, setup.id, now).await?;

        tx.commit().await?;

        self.audit
            .record(
                &AuditActor::from(&admin),
                AuditAction::AdminSetupComplete,
                Some((AuditTarget::Admin, admin.id.to_string())),
                None,
            )
            .await;

        Ok(admin)
    }
}

pub fn require_primary(admin: &AdminUser) -> Result<(), AppError> {
    if admin.role != AdminRole::PrimaryAdmin {
        return Err(AppError::Forbidden("Only primary admins can manage admins.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(locked_until: Option<DateTime<Utc>>) -> AdminUser {
        let now = Utc::now();
        AdminUser {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            name: "Ops".into(),
            password_hash: None,
            role: AdminRole::Admin,
            is_active: true,
            failed_login_attempts: 0,
            locked_until,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn session(expires_at: DateTime<Utc>, last_activity_at: DateTime<Utc>) -> AdminSession {
        AdminSession {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            token: "t".into(),
            expires_at,
            last_activity_at,
            created_at: last_activity_at,
        }
    }

    #[test]
    fn lock_expires() {
        let now = Utc::now();
        assert!(!is_locked(&admin(None), now));
        assert!(is_locked(&admin(Some(now + Duration::minutes(1))), now));
        assert!(!is_locked(&admin(Some(now - Duration::seconds(1))), now));
    }

    #[test]
    fn session_timers() {
        let now = Utc::now();
        let fresh = session(now + Duration::minutes(20), now - Duration::minutes(10));
        assert_eq!(session_state(&fresh, now), SessionState::Active);

        let expired = session(now - Duration::seconds(1), now - Duration::minutes(5));
        assert_eq!(session_state(&expired, now), SessionState::Expired);

        let idle = session(now + Duration::minutes(5), now - Duration::minutes(31));
        assert_eq!(session_state(&idle, now), SessionState::Idle);

        let (last, expires) = slide_session(now);
        assert_eq!(last, now);
        assert_eq!(expires - now, Duration::minutes(SESSION_MINUTES));
    }

    #[test]
    fn setup_token_lifecycle() {
        let created = Utc::now();
        let mut token = AdminSetupToken {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            token: "t".into(),
            expires_at: created + Duration::hours(SETUP_TOKEN_HOURS),
            used_at: None,
            created_at: created,
        };

        let almost = created + Duration::hours(47) + Duration::minutes(59);
        assert_eq!(setup_token_state(&token, almost), SetupTokenState::Valid);
        assert_eq!(
            setup_token_state(&token, created + Duration::hours(48)),
            SetupTokenState::Expired
        );

        token.used_at = Some(almost);
        assert_eq!(setup_token_state(&token, almost), SetupTokenState::Used);
    }

    #[test]
    fn only_primary_admins_manage_admins() {
        let mut actor = admin(None);
        assert!(matches!(require_primary(&actor), Err(AppError::Forbidden(_))));
        actor.role = AdminRole::PrimaryAdmin;
        assert!(require_primary(&actor).is_ok());
    }
}
