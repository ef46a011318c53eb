// src/models/admin.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    auth::{validate_password_policy, UserRole},
    tenancy::PlanDistribution,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    PrimaryAdmin,
    Admin,
}

// ---
// Platform operator (never a tenant user)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,

    // None until the setup token has been redeemed.
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: Option<String>,

    pub role: AdminRole,
    pub is_active: bool,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub failed_login_attempts: i32,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub locked_until: Option<DateTime<Utc>>,

    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdminSession {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdminSetupToken {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---
// Audit log
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    AdminLogin,
    AdminLogout,
    AdminCreate,
    AdminDelete,
    AdminSetupComplete,
    TenantView,
    TenantUpdate,
    TenantSuspend,
    TenantUnsuspend,
    TenantDelete,
    UserView,
    UserResetPassword,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AdminLogin => "admin.login",
            AuditAction::AdminLogout => "admin.logout",
            AuditAction::AdminCreate => "admin.create",
            AuditAction::AdminDelete => "admin.delete",
            AuditAction::AdminSetupComplete => "admin.setup_complete",
            AuditAction::TenantView => "tenant.view",
            AuditAction::TenantUpdate => "tenant.update",
            AuditAction::TenantSuspend => "tenant.suspend",
            AuditAction::TenantUnsuspend => "tenant.unsuspend",
            AuditAction::TenantDelete => "tenant.delete",
            AuditAction::UserView => "user.view",
            AuditAction::UserResetPassword => "user.reset_password",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditTarget {
    Tenant,
    User,
    Admin,
}

impl AuditTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditTarget::Tenant => "tenant",
            AuditTarget::User => "user",
            AuditTarget::Admin => "admin",
        }
    }
}

/// Who did it; copied into every entry so the log outlives the admin row.
#[derive(Debug, Clone)]
pub struct AuditActor {
    pub admin_id: Uuid,
    pub admin_email: String,
}

impl From<&AdminUser> for AuditActor {
    fn from(admin: &AdminUser) -> Self {
        Self {
            admin_id: admin.id,
            admin_email: admin.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub admin_email: String,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ---
// Platform views
// ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tenant_slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tenants: i64,
    pub total_users: i64,
    pub plan_distribution: PlanDistribution,
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// (page, limit, offset) with page ≥ 1 and limit clamped to 1..=100.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, 100);
        (page, limit, (page - 1) * limit)
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,

    // Omit to onboard the new admin through a setup link instead.
    #[validate(custom(function = "validate_password_policy"))]
    pub password: Option<String>,

    pub role: AdminRole,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SetupTokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSetupPayload {
    #[validate(length(min = 1, message = "Setup token is required."))]
    pub token: String,

    #[validate(custom(function = "validate_password_policy"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords don't match."))]
    pub confirm_password: String,
}

// ---
// Responses
// ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminResponse {
    pub admin: AdminUser,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetupTokenInfo {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetLinkResponse {
    pub message: String,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_input() {
        let q = PageQuery { page: Some(0), limit: Some(1000) };
        assert_eq!(q.resolve(10), (1, 100, 0));

        let q = PageQuery { page: Some(3), limit: None };
        assert_eq!(q.resolve(50), (3, 50, 100));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
    }

    #[test]
    fn audit_actions_use_dotted_names() {
        assert_eq!(AuditAction::TenantUnsuspend.as_str(), "tenant.unsuspend");
        assert_eq!(AuditAction::UserResetPassword.as_str(), "user.reset_password");
    }
}
