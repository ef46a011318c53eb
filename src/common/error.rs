// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Single error type for the whole request path. Repositories and services
// return it un-wrapped with `?`; only `into_response` decides what the
// outside world gets to see.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    // Domain-level validation (duplicate invitation, invalid token state, ...)
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, Vec<String>>,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or missing token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Tenant suspended")]
    TenantSuspended,

    #[error("User signs in with an external provider")]
    OAuthOnlyUser,

    #[error("External account linked to another tenant")]
    AccountLinkedToOtherTenant,

    #[error("OAuth error: {0}")]
    OAuthError(String),

    #[error("Account locked")]
    Locked,

    #[error("Account deactivated")]
    Deactivated,

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Validation failure attached to a single field.
    pub fn field(field: &str, message: &str, detail: &str) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), vec![detail.to_string()]);
        AppError::Validation {
            message: message.to_string(),
            field_errors,
        }
    }

    /// Stable machine-readable code for the rejections the UI reacts to.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AppError::TenantNotFound => Some("TenantNotFound"),
            AppError::TenantSuspended => Some("TenantSuspended"),
            AppError::OAuthOnlyUser => Some("OAuthOnlyUser"),
            AppError::AccountLinkedToOtherTenant => Some("AccountLinkedToOtherTenant"),
            AppError::OAuthError(_) => Some("OAuthError"),
            AppError::Locked => Some("AccountLocked"),
            AppError::Deactivated => Some("AccountDeactivated"),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::Unauthorized(_)
            | AppError::Deactivated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::TenantSuspended
            | AppError::AccountLinkedToOtherTenant => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::TenantNotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::OAuthOnlyUser | AppError::OAuthError(_) => StatusCode::BAD_REQUEST,
            AppError::Locked => StatusCode::LOCKED,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let error_message: String = match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::Validation { message, field_errors } => {
                let body = Json(json!({
                    "error": message,
                    "details": field_errors,
                }));
                return (status, body).into_response();
            }
            // Tenant-not-found and wrong password must look the same at login.
            AppError::InvalidCredentials => "Invalid email or password.".into(),
            AppError::InvalidToken => "Invalid or missing authentication token.".into(),
            AppError::Unauthorized(msg) => msg,
            AppError::Forbidden(msg) => msg,
            AppError::NotFound(resource) => format!("{resource} not found."),
            AppError::Conflict(msg) => msg,
            AppError::TenantNotFound => "Organization not found.".into(),
            AppError::TenantSuspended => {
                "This organization has been suspended. Please contact support.".into()
            }
            AppError::OAuthOnlyUser => {
                "This account uses an external sign-in provider. Please sign in with it.".into()
            }
            AppError::AccountLinkedToOtherTenant => {
                "This external account is already linked to another organization.".into()
            }
            AppError::OAuthError(_) => "External sign-in failed. Please try again.".into(),
            AppError::Locked => "Account temporarily locked. Please try again later.".into(),
            AppError::Deactivated => "Account is deactivated.".into(),

            // Everything else is a 500: full detail goes to the log, never to the client.
            ref e => {
                tracing::error!("Internal server error: {:?}", e);
                "An unexpected error occurred.".into()
            }
        };

        let body = match code {
            Some(code) => Json(json!({ "error": error_message, "code": code })),
            None => Json(json!({ "error": error_message })),
        };
        (status, body).into_response()
    }
}
