// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::tenancy::validate_tenant_slug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Owner,
    Admin,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::Member => "member",
        }
    }
}

// Tenant-scoped identity. The same email may exist in several tenants.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,

    // None means the user only signs in through an OAuth provider.
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: Option<String>,

    pub role: UserRole,
    pub tenant_id: Uuid,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub sessions_valid_after: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful sign-in, before a token is minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: UserRole,
    pub tenant_slug: String,
}

// JWT claims. Role and tenant are fixed at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub tid: Uuid,
    pub tslug: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters."))]
    pub name: String,

    #[validate(
        email(message = "Invalid email address."),
        length(min = 5, max = 255, message = "Email must be between 5 and 255 characters.")
    )]
    pub email: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords don't match."))]
    pub confirm_password: String,

    #[validate(length(min = 2, max = 100, message = "Organization name must be between 2 and 100 characters."))]
    pub tenant_name: String,

    #[validate(custom(function = "validate_tenant_slug"))]
    pub tenant_slug: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,

    // Falls back to the tenant resolved from the host when absent.
    pub tenant_slug: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(custom(function = "validate_tenant_slug"))]
    pub tenant_slug: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordPayload {
    #[validate(length(min = 1, message = "Reset token is required."))]
    pub token: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords don't match."))]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub current_password: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub new_password: String,

    #[validate(must_match(other = "new_password", message = "Passwords don't match."))]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters."))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
}

// ---
// Responses
// ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub tenant_slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub tenant_slug: String,
    pub tenant_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_url: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reset_url: None,
        }
    }
}

/// At least 8 (max 100) characters with an uppercase letter, a lowercase letter and a digit.
pub fn validate_password_policy(password: &str) -> Result<(), ValidationError> {
    let failure = if password.len() < 8 || password.len() > 100 {
        Some("Password must be between 8 and 100 characters.")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter.")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter.")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one number.")
    } else {
        None
    };

    match failure {
        Some(message) => {
            let mut err = ValidationError::new("password_policy");
            err.message = Some(message.into());
            Err(err)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_policy() {
        assert!(validate_password_policy("Secret123").is_ok());
        assert!(validate_password_policy("Sh0rt").is_err());
        assert!(validate_password_policy("alllowercase1").is_err());
        assert!(validate_password_policy("ALLUPPERCASE1").is_err());
        assert!(validate_password_policy("NoDigitsHere").is_err());
    }

    #[test]
    fn signup_payload_checks_confirmation_and_slug() {
        let payload = SignupPayload {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "Secret123".into(),
            confirm_password: "Secret124".into(),
            tenant_name: "Acme".into(),
            tenant_slug: "www".into(),
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("confirm_password"));
        assert!(fields.contains_key("tenant_slug"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn serialized_user_hides_credentials() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            password_hash: Some("$2b$12$hash".into()),
            role: UserRole::Owner,
            tenant_id: Uuid::new_v4(),
            sessions_valid_after: now,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("sessionsValidAfter").is_none());
        assert_eq!(json["role"], "owner");
    }
}
