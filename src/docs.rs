// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::change_password,
        handlers::auth::slug_available,
        handlers::auth::current_tenant,

        // --- Users & Team ---
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::users::list_team,
        handlers::users::update_tenant,

        // --- Todos ---
        handlers::todos::list_todos,
        handlers::todos::create_todo,
        handlers::todos::get_todo,
        handlers::todos::update_todo,
        handlers::todos::toggle_todo,
        handlers::todos::delete_todo,

        // --- Invitations ---
        handlers::invitations::list_invitations,
        handlers::invitations::create_invitation,
        handlers::invitations::revoke_invitation,
        handlers::invitations::preview_invitation,
        handlers::invitations::accept_invitation,

        // --- Admin auth ---
        handlers::admin_auth::login,
        handlers::admin_auth::logout,
        handlers::admin_auth::me,
        handlers::admin_auth::validate_setup,
        handlers::admin_auth::complete_setup,

        // --- Admin ---
        handlers::admin::list_admins,
        handlers::admin::create_admin,
        handlers::admin::delete_admin,
        handlers::admin::list_tenants,
        handlers::admin::get_tenant,
        handlers::admin::update_tenant,
        handlers::admin::delete_tenant,
        handlers::admin::list_users,
        handlers::admin::get_user,
        handlers::admin::reset_user_password,
        handlers::admin::list_audit_logs,
        handlers::admin::dashboard_stats,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::SignupPayload,
            models::auth::SignupResponse,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::ForgotPasswordPayload,
            models::auth::ResetPasswordPayload,
            models::auth::ChangePasswordPayload,
            models::auth::UpdateProfilePayload,
            models::auth::MessageResponse,

            // --- Tenancy ---
            models::tenancy::TenantPlan,
            models::tenancy::Tenant,
            models::tenancy::TenantWithUserCount,
            models::tenancy::PlanDistribution,
            models::tenancy::UpdateTenantPayload,
            models::tenancy::AdminUpdateTenantPayload,
            models::tenancy::SlugAvailability,
            models::tenancy::TenantInfo,

            // --- Todos ---
            models::todo::Todo,
            models::todo::CreateTodoPayload,
            models::todo::UpdateTodoPayload,

            // --- Invitations ---
            models::invitation::InvitationStatus,
            models::invitation::Invitation,
            models::invitation::PendingInvitation,
            models::invitation::InvitationPreview,
            models::invitation::CreateInvitationPayload,
            models::invitation::CreateInvitationResponse,
            models::invitation::AcceptInvitationPayload,
            models::invitation::AcceptInvitationResponse,

            // --- Admin ---
            models::admin::AdminRole,
            models::admin::AdminUser,
            models::admin::AuditLogEntry,
            models::admin::PlatformUser,
            models::admin::DashboardStats,
            models::admin::Pagination,
            models::admin::AdminLoginPayload,
            models::admin::CreateAdminPayload,
            models::admin::CreateAdminResponse,
            models::admin::CompleteSetupPayload,
            models::admin::SetupTokenInfo,
            models::admin::ResetLinkResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-up, sign-in and password recovery"),
        (name = "Users", description = "The signed-in user's profile"),
        (name = "Team", description = "Organization members and settings"),
        (name = "Todos", description = "Tenant-scoped todos"),
        (name = "Invitations", description = "Inviting people into an organization"),
        (name = "Admin Auth", description = "Platform admin sessions and account setup"),
        (name = "Admin", description = "Cross-tenant administration")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
