// src/services/invitation_service.rs

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, tokens::generate_token},
    db::{invitation_repo::NewInvitation, user_repo::NewUser, InvitationRepository, UserRepository},
    models::{
        auth::{User, UserRole},
        invitation::{
            CreateInvitationPayload, Invitation, InvitationPreview, InvitationStatus, PendingInvitation,
        },
    },
    services::{
        authz::{ensure, Capability},
        password::PasswordHasher,
        scope::{validate_context, Context},
    },
};

pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct InvitationService {
    invitation_repo: InvitationRepository,
    user_repo: UserRepository,
    hasher: PasswordHasher,
    pool: PgPool,
}

impl InvitationService {
    pub fn new(
        invitation_repo: InvitationRepository,
        user_repo: UserRepository,
        hasher: PasswordHasher,
        pool: PgPool,
    ) -> Self {
        Self {
            invitation_repo,
            user_repo,
            hasher,
            pool,
        }
    }

    pub async fn create(
        &self,
        ctx: &Context,
        inviter_role: UserRole,
        payload: &CreateInvitationPayload,
    ) -> Result<Invitation, AppError> {
        validate_context(ctx)?;

        let capability = Capability::to_invite(payload.role)
            .ok_or_else(|| AppError::field("role", "Role must be admin or member.", "invalid role"))?;
        ensure(inviter_role, capability)?;

        let email = payload.email.trim().to_lowercase();

        if self.user_repo.exists_in_tenant(&email, ctx.tenant_id).await? {
            return Err(AppError::field(
                "email",
                "This person is already a member of your organization.",
                "already a member",
            ));
        }

        let mut tx = self.pool.begin().await?;

        if self
            .invitation_repo
            .has_active_pending(&mut *tx, ctx.tenant_id, &email)
            .await?
        {
            return Err(AppError::field(
                "email",
                "An invitation has already been sent to this email.",
                "already invited",
            ));
        }

        // Stale pending rows would still hold the partial unique index.
        self.invitation_repo
            .expire_stale_for_email(&mut *tx, ctx.tenant_id, &email)
            .await?;

        let token = generate_token();
        let invitation = self
            .invitation_repo
            .create(
                &mut *tx,
                NewInvitation {
                    email: &email,
                    role: payload.role,
                    token: &token,
                    tenant_id: ctx.tenant_id,
                    invited_by_id: ctx.user_id,
                    expires_at: Utc::now() + Duration::days(INVITATION_TTL_DAYS),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(tenant_id = %ctx.tenant_id, invitation_id = %invitation.id, "Invitation created");
        Ok(invitation)
    }

    /// Redeems a token into a new user. Concurrent redemptions queue on the row lock;
    /// only the first one sees a pending invitation.
    pub async fn accept(&self, token: &str, name: &str, password: &str) -> Result<(Invitation, User), AppError> {
        let password_hash = self.hasher.hash(password).await?;

        let mut tx = self.pool.begin().await?;

        let invitation = self
            .invitation_repo
            .lock_by_token(&mut *tx, token)
            .await?
            .ok_or_else(|| AppError::NotFound("Invitation".into()))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::field(
                "token",
                "This invitation is no longer valid.",
                "no longer valid",
            ));
        }

        if invitation.expires_at <= Utc::now() {
            self.invitation_repo
                .set_status(&mut *tx, invitation.id, invitation.tenant_id, InvitationStatus::Expired)
                .await?;
            tx.commit().await?;
            return Err(AppError::field("token", "This invitation has expired.", "expired"));
        }

        let user = self
            .user_repo
            .create(
                &mut *tx,
                NewUser {
                    email: &invitation.email,
                    name: name.trim(),
                    password_hash: Some(&password_hash),
                    role: invitation.role,
                    tenant_id: invitation.tenant_id,
                },
            )
            .await?;

        self.invitation_repo
            .mark_accepted(&mut *tx, invitation.id, invitation.tenant_id)
            .await?;

        tx.commit().await?;

        tracing::info!(tenant_id = %invitation.tenant_id, user_id = %user.id, "Invitation accepted");
        Ok((invitation, user))
    }

    pub async fn revoke(&self, ctx: &Context, role: UserRole, id: Uuid) -> Result<(), AppError> {
        validate_context(ctx)?;
        ensure(role, Capability::RevokeInvitation)?;

        let invitation = self
            .invitation_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invitation".into()))?;

        if invitation.tenant_id != ctx.tenant_id {
            return Err(AppError::Forbidden("You do not have access to this invitation.".into()));
        }

        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::field(
                "status",
                "Only pending invitations can be revoked.",
                "not pending",
            ));
        }

        if !self.invitation_repo.revoke(id, ctx.tenant_id).await? {
            // Accepted or revoked between the read and the write.
            return Err(AppError::field(
                "status",
                "Only pending invitations can be revoked.",
                "not pending",
            ));
        }
        Ok(())
    }

    pub async fn list_pending(&self, ctx: &Context, role: UserRole) -> Result<Vec<PendingInvitation>, AppError> {
        validate_context(ctx)?;
        ensure(role, Capability::ViewInvitations)?;
        self.invitation_repo.list_pending(ctx.tenant_id).await
    }

    /// Display data for the accept page. Stale pending rows read as expired.
    pub async fn preview(&self, token: &str) -> Result<InvitationPreview, AppError> {
        let mut preview = self
            .invitation_repo
            .find_preview_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Invitation".into()))?;

        if preview.status == InvitationStatus::Pending && preview.expires_at <= Utc::now() {
            preview.status = InvitationStatus::Expired;
        }
        preview.can_accept = preview.status == InvitationStatus::Pending;
        Ok(preview)
    }
}
