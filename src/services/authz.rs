// src/services/authz.rs

use crate::{common::error::AppError, models::auth::UserRole};

/// Everything a tenant user can be allowed to do beyond owning todos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageTodos,
    ViewTeam,
    ViewInvitations,
    InviteMember,
    InviteAdmin,
    RevokeInvitation,
    ManageTenantSettings,
}

impl Capability {
    pub fn slug(&self) -> &'static str {
        match self {
            Capability::ManageTodos => "todos:manage",
            Capability::ViewTeam => "team:view",
            Capability::ViewInvitations => "invitations:view",
            Capability::InviteMember => "invitations:invite_member",
            Capability::InviteAdmin => "invitations:invite_admin",
            Capability::RevokeInvitation => "invitations:revoke",
            Capability::ManageTenantSettings => "tenant:settings",
        }
    }

    /// Capability needed to invite someone into `role`. Nobody can invite an owner.
    pub fn to_invite(role: UserRole) -> Option<Capability> {
        match role {
            UserRole::Owner => None,
            UserRole::Admin => Some(Capability::InviteAdmin),
            UserRole::Member => Some(Capability::InviteMember),
        }
    }
}

// The whole (role, action) table.
pub fn can(role: UserRole, capability: Capability) -> bool {
    use Capability::*;

    match role {
        UserRole::Owner => true,
        UserRole::Admin => matches!(
            capability,
            ManageTodos | ViewTeam | ViewInvitations | InviteMember | RevokeInvitation
        ),
        UserRole::Member => matches!(capability, ManageTodos | ViewTeam),
    }
}

pub fn ensure(role: UserRole, capability: Capability) -> Result<(), AppError> {
    if can(role, capability) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Your role does not allow '{}'.",
            capability.slug()
        )))
    }
}
