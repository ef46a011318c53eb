// src/handlers/admin_auth.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use validator::Validate;

use crate::{
    common::{
        cookies::{clear_cookie, CookieSpec, ADMIN_SESSION_COOKIE},
        error::AppError,
    },
    config::AppState,
    middleware::admin::CurrentAdmin,
    models::{
        admin::{AdminLoginPayload, AdminUser, CompleteSetupPayload, SetupTokenInfo, SetupTokenQuery},
        auth::MessageResponse,
    },
    services::admin_auth::SESSION_MINUTES,
};

#[utoipa::path(
    post,
    path = "/api/admin/auth/login",
    tag = "Admin Auth",
    request_body = AdminLoginPayload,
    responses(
        (status = 200, description = "Signed in; admin session cookie set", body = AdminUser),
        (status = 401, description = "Invalid email or password"),
        (status = 423, description = "Account temporarily locked")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<AdminLoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (admin, session) = app_state
        .admin_auth_service
        .login(&payload.email, &payload.password)
        .await?;

    // Host-only: the admin panel never shares its cookie with tenant subdomains.
    let cookie = CookieSpec {
        name: ADMIN_SESSION_COOKIE,
        value: &session.token,
        max_age_secs: Some(SESSION_MINUTES * 60),
        domain: None,
        secure: app_state.config.uses_https(),
    }
    .to_header()?;

    Ok(([(header::SET_COOKIE, cookie)], Json(admin)))
}

#[utoipa::path(
    post,
    path = "/api/admin/auth/logout",
    tag = "Admin Auth",
    responses((status = 200, description = "Session ended and cookie cleared", body = MessageResponse))
)]
pub async fn logout(State(app_state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(ADMIN_SESSION_COOKIE) {
        if let Err(e) = app_state.admin_auth_service.logout(cookie.value()).await {
            tracing::error!("Failed to delete admin session on logout: {:?}", e);
        }
    }

    (
        [(header::SET_COOKIE, clear_cookie(ADMIN_SESSION_COOKIE, None))],
        Json(MessageResponse::new("Signed out.")),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/auth/me",
    tag = "Admin Auth",
    responses(
        (status = 200, description = "The signed-in admin", body = AdminUser),
        (status = 401, description = "No valid admin session")
    )
)]
pub async fn me(CurrentAdmin(admin): CurrentAdmin) -> Json<AdminUser> {
    Json(admin)
}

#[utoipa::path(
    get,
    path = "/api/admin/auth/setup",
    tag = "Admin Auth",
    params(SetupTokenQuery),
    responses(
        (status = 200, description = "Who the setup link belongs to", body = SetupTokenInfo),
        (status = 400, description = "Link already used, expired, or account already set up"),
        (status = 404, description = "Unknown link")
    )
)]
pub async fn validate_setup(
    State(app_state): State<AppState>,
    Query(query): Query<SetupTokenQuery>,
) -> Result<Json<SetupTokenInfo>, AppError> {
    let info = app_state
        .admin_auth_service
        .validate_setup_token(&query.token)
        .await?;
    Ok(Json(info))
}

#[utoipa::path(
    post,
    path = "/api/admin/auth/setup",
    tag = "Admin Auth",
    request_body = CompleteSetupPayload,
    responses(
        (status = 200, description = "Password set; the admin can now sign in", body = MessageResponse),
        (status = 400, description = "Link already used, expired, or passwords invalid"),
        (status = 404, description = "Unknown link")
    )
)]
pub async fn complete_setup(
    State(app_state): State<AppState>,
    Json(payload): Json<CompleteSetupPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let admin = app_state
        .admin_auth_service
        .complete_setup(&payload.token, &payload.password)
        .await?;

    tracing::info!(admin = %admin.email, "Admin account setup completed");
    Ok(Json(MessageResponse::new("Your account is ready. You can now sign in.")))
}
