// src/handlers/users.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{CanManageTenantSettings, CanViewTeam, RequireCapability},
    },
    models::{
        auth::{UpdateProfilePayload, User},
        tenancy::{Tenant, UpdateTenantPayload},
    },
    services::scope::Context,
};

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses((status = 200, description = "The signed-in user", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(session): AuthenticatedUser) -> Json<User> {
    Json(session.user)
}

#[utoipa::path(
    patch,
    path = "/api/users/me",
    tag = "Users",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid input or email taken in this organization")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_me(
    State(app_state): State<AppState>,
    ctx: Context,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;
    let user = app_state.auth_service.update_profile(&ctx, &payload).await?;
    Ok(Json(user))
}

// ---
// Team & organization settings
// ---

#[utoipa::path(
    get,
    path = "/api/team",
    tag = "Team",
    responses((status = 200, description = "Everyone in the organization", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_team(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanViewTeam>,
) -> Result<Json<Vec<User>>, AppError> {
    let members = app_state.tenant_service.list_members(&ctx).await?;
    Ok(Json(members))
}

#[utoipa::path(
    patch,
    path = "/api/tenant",
    tag = "Team",
    request_body = UpdateTenantPayload,
    responses(
        (status = 200, description = "Organization renamed", body = Tenant),
        (status = 403, description = "Only the owner can change settings")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_tenant(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTenantSettings>,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<Json<Tenant>, AppError> {
    payload.validate()?;
    let tenant = app_state
        .tenant_service
        .rename(ctx.tenant_id, payload.name.trim())
        .await?;
    Ok(Json(tenant))
}
