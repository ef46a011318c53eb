// src/handlers/admin.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::admin::{CurrentAdmin, RequirePrimaryAdmin},
    models::{
        admin::{
            AdminUser, AuditLogEntry, CreateAdminPayload, CreateAdminResponse, DashboardStats, Page,
            PageQuery, PlatformUser, ResetLinkResponse,
        },
        tenancy::{AdminUpdateTenantPayload, Tenant, TenantWithUserCount},
    },
    services::mail::{self, templates},
};

// ---
// Admins (primary admins only)
// ---

#[utoipa::path(
    get,
    path = "/api/admin/admins",
    tag = "Admin",
    responses(
        (status = 200, description = "All platform admins", body = Vec<AdminUser>),
        (status = 403, description = "Primary admins only")
    )
)]
pub async fn list_admins(
    State(app_state): State<AppState>,
    RequirePrimaryAdmin(_admin): RequirePrimaryAdmin,
) -> Result<Json<Vec<AdminUser>>, AppError> {
    let admins = app_state.admin_auth_service.list_admins().await?;
    Ok(Json(admins))
}

#[utoipa::path(
    post,
    path = "/api/admin/admins",
    tag = "Admin",
    request_body = CreateAdminPayload,
    responses(
        (status = 201, description = "Admin created; a setup link is mailed when no password was given", body = CreateAdminResponse),
        (status = 400, description = "Invalid input or email already in use"),
        (status = 403, description = "Primary admins only")
    )
)]
pub async fn create_admin(
    State(app_state): State<AppState>,
    RequirePrimaryAdmin(actor): RequirePrimaryAdmin,
    Json(payload): Json<CreateAdminPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (admin, setup_token) = app_state
        .admin_auth_service
        .create_admin(&actor, &payload)
        .await?;

    let mut response = CreateAdminResponse {
        admin,
        email_sent: false,
        setup_url: None,
    };

    if let Some(token) = setup_token {
        let setup_url = format!("{}/admin/setup?token={}", app_state.config.base_url(), token);
        response.email_sent = mail::deliver(
            &app_state.mail,
            templates::admin_setup_email(
                &response.admin.email,
                &response.admin.name,
                &actor.name,
                &setup_url,
            ),
        )
        .await;
        if !app_state.config.is_production() {
            response.setup_url = Some(setup_url);
        }
    }

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/admins/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Admin id")),
    responses(
        (status = 204, description = "Admin deleted"),
        (status = 400, description = "Own account or last primary admin"),
        (status = 403, description = "Primary admins only"),
        (status = 404, description = "No such admin")
    )
)]
pub async fn delete_admin(
    State(app_state): State<AppState>,
    RequirePrimaryAdmin(actor): RequirePrimaryAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.admin_auth_service.delete_admin(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Tenants
// ---

#[utoipa::path(
    get,
    path = "/api/admin/tenants",
    tag = "Admin",
    params(PageQuery),
    responses((status = 200, description = "Tenants with user counts, newest first", body = Page<TenantWithUserCount>))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<TenantWithUserCount>>, AppError> {
    let page = app_state.platform_service.list_tenants(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/admin/tenants/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "The tenant", body = TenantWithUserCount),
        (status = 404, description = "No such tenant")
    )
)]
pub async fn get_tenant(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantWithUserCount>, AppError> {
    let tenant = app_state.platform_service.get_tenant(&admin, id).await?;
    Ok(Json(tenant))
}

#[utoipa::path(
    patch,
    path = "/api/admin/tenants/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Tenant id")),
    request_body = AdminUpdateTenantPayload,
    responses(
        (status = 200, description = "Tenant updated", body = Tenant),
        (status = 404, description = "No such tenant")
    )
)]
pub async fn update_tenant(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateTenantPayload>,
) -> Result<Json<Tenant>, AppError> {
    payload.validate()?;
    let tenant = app_state
        .platform_service
        .update_tenant(&admin, id, &payload)
        .await?;
    Ok(Json(tenant))
}

#[utoipa::path(
    delete,
    path = "/api/admin/tenants/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 204, description = "Tenant and all of its data deleted"),
        (status = 404, description = "No such tenant")
    )
)]
pub async fn delete_tenant(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.platform_service.delete_tenant(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Users
// ---

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(PageQuery),
    responses((status = 200, description = "Users across every tenant", body = Page<PlatformUser>))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PlatformUser>>, AppError> {
    let page = app_state.platform_service.list_users(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user with their tenant", body = PlatformUser),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<PlatformUser>, AppError> {
    let user = app_state.platform_service.get_user(&admin, id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/reset-password",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Reset link issued and mailed", body = ResetLinkResponse),
        (status = 404, description = "No such user")
    )
)]
pub async fn reset_user_password(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<ResetLinkResponse>, AppError> {
    let (user, token) = app_state
        .platform_service
        .reset_user_password(&admin, id)
        .await?;

    let reset_url = app_state
        .config
        .tenant_path_url(&user.tenant_slug, &format!("/reset-password?token={token}"));

    let email_sent = mail::deliver(
        &app_state.mail,
        templates::password_reset_email(&user.email, &user.name, &reset_url),
    )
    .await;

    Ok(Json(ResetLinkResponse {
        message: format!("A password reset link was issued for {}.", user.email),
        email_sent,
        reset_url: (!app_state.config.is_production()).then_some(reset_url),
    }))
}

// ---
// Audit log & dashboard
// ---

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    tag = "Admin",
    params(PageQuery),
    responses((status = 200, description = "Audit entries, newest first", body = Page<AuditLogEntry>))
)]
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<AuditLogEntry>>, AppError> {
    let page = app_state.platform_service.list_audit_logs(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/stats",
    tag = "Admin",
    responses((status = 200, description = "Platform totals and plan distribution", body = DashboardStats))
)]
pub async fn dashboard_stats(
    State(app_state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = app_state.platform_service.stats().await?;
    Ok(Json(stats))
}
