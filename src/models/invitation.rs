// src/models/invitation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::auth::{validate_password_policy, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub token: String,
    pub status: InvitationStatus,
    pub tenant_id: Uuid,
    pub invited_by_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Pending list row with the inviter joined in.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvitation {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub invited_by_id: Uuid,
    pub invited_by_name: String,
    pub invited_by_email: String,
}

/// What the accept page shows before the invitee picks a password.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationPreview {
    pub email: String,
    pub role: UserRole,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub tenant_name: String,
    pub tenant_slug: String,
    pub invited_by_name: String,
    #[sqlx(skip)]
    pub can_accept: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InvitationTokenQuery {
    pub token: String,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationPayload {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,

    #[validate(custom(function = "validate_invitable_role"))]
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationPayload {
    #[validate(length(min = 1, message = "Token is required."))]
    pub token: String,

    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters."))]
    pub name: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub password: String,
}

// ---
// Responses
// ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationResponse {
    pub invitation: Invitation,
    pub email_sent: bool,
    // Only outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationResponse {
    pub message: String,
    pub tenant_slug: String,
    pub tenant_url: String,
}

fn validate_invitable_role(role: &UserRole) -> Result<(), ValidationError> {
    if *role == UserRole::Owner {
        let mut err = ValidationError::new("role");
        err.message = Some("Role must be admin or member.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_cannot_be_invited() {
        let payload = CreateInvitationPayload {
            email: "new@example.com".into(),
            role: UserRole::Owner,
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("role"));

        let payload = CreateInvitationPayload {
            email: "new@example.com".into(),
            role: UserRole::Member,
        };
        assert!(payload.validate().is_ok());
    }
}
