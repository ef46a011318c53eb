// src/handlers/auth.rs

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        cookies::{clear_cookie, CookieSpec, SESSION_COOKIE},
        error::AppError,
    },
    config::{AppState, Config},
    middleware::{
        auth::AuthenticatedUser,
        tenancy::{MaybeTenantSlug, TenantSlug},
    },
    models::{
        auth::{
            AuthResponse, ChangePasswordPayload, ForgotPasswordPayload, Identity, LoginPayload,
            MessageResponse, ResetPasswordPayload, SignupPayload, SignupResponse,
        },
        tenancy::{SlugAvailability, SlugQuery, TenantInfo},
    },
    services::{
        auth::SESSION_TTL_DAYS,
        mail::{self, templates},
        scope::Context,
    },
};

const FORGOT_PASSWORD_MESSAGE: &str = "If an account exists for that email, a reset link has been sent.";

pub fn session_cookie(config: &Config, token: &str) -> Result<HeaderValue, AppError> {
    let domain = config.cookie_domain();
    CookieSpec {
        name: SESSION_COOKIE,
        value: token,
        max_age_secs: Some(SESSION_TTL_DAYS * 24 * 60 * 60),
        domain: domain.as_deref(),
        secure: config.uses_https(),
    }
    .to_header()
}

/// Token plus the user row, with the session cookie set.
async fn signed_in(
    app_state: &AppState,
    identity: Identity,
) -> Result<([(HeaderName, HeaderValue); 1], Json<AuthResponse>), AppError> {
    let token = app_state.auth_service.issue_token(&identity)?;
    let user = app_state
        .auth_service
        .get_user(&Context::new(identity.tenant_id, identity.user_id)?)
        .await?;
    let cookie = session_cookie(&app_state.config, &token)?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            token,
            user,
            tenant_slug: identity.tenant_slug,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = SignupPayload,
    responses(
        (status = 201, description = "Organization and owner created", body = SignupResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Subdomain already taken")
    )
)]
pub async fn signup(
    State(app_state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (tenant, owner) = app_state.tenant_service.signup(&payload).await?;

    let login_url = app_state.config.tenant_path_url(&tenant.slug, "/login");
    mail::deliver(
        &app_state.mail,
        templates::welcome_email(&owner.email, &owner.name, &tenant.name, &login_url),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Organization created. You can now sign in.".into(),
            tenant_url: app_state.config.tenant_url(&tenant.slug),
            tenant_slug: tenant.slug,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Organization suspended")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    MaybeTenantSlug(host_tenant): MaybeTenantSlug,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // The host decides; the body only matters on the root domain.
    let tenant_slug = host_tenant
        .or(payload.tenant_slug.clone())
        .ok_or(AppError::InvalidCredentials)?;

    let identity = app_state
        .auth_service
        .authorize(&payload.email, &payload.password, &tenant_slug)
        .await?;

    tracing::info!(tenant = %identity.tenant_slug, user_id = %identity.user_id, "User signed in");
    signed_in(&app_state, identity).await
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Session cookie cleared", body = MessageResponse))
)]
pub async fn logout(State(app_state): State<AppState>) -> impl IntoResponse {
    let domain = app_state.config.cookie_domain();
    (
        [(header::SET_COOKIE, clear_cookie(SESSION_COOKIE, domain.as_deref()))],
        Json(MessageResponse::new("Signed out.")),
    )
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordPayload,
    responses((status = 200, description = "Same answer whether or not the account exists", body = MessageResponse))
)]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    MaybeTenantSlug(host_tenant): MaybeTenantSlug,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let mut response = MessageResponse::new(FORGOT_PASSWORD_MESSAGE);

    let Some(tenant_slug) = host_tenant.or(payload.tenant_slug.clone()) else {
        return Ok(Json(response));
    };

    if let Some((user, tenant, token)) = app_state
        .auth_service
        .request_password_reset(&payload.email, &tenant_slug)
        .await?
    {
        let reset_url = app_state
            .config
            .tenant_path_url(&tenant.slug, &format!("/reset-password?token={token}"));

        mail::deliver(
            &app_state.mail,
            templates::password_reset_email(&user.email, &user.name, &reset_url),
        )
        .await;

        if !app_state.config.is_production() {
            response.reset_url = Some(reset_url);
        }
    }

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset link")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let tenant = app_state
        .auth_service
        .reset_password(&payload.token, &payload.password)
        .await?;

    tracing::info!(tenant = %tenant.slug, "Password reset completed");
    Ok(Json(MessageResponse::new(
        "Your password has been reset. You can now sign in.",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 200, description = "Password changed; a fresh session is returned", body = AuthResponse),
        (status = 400, description = "Current password is incorrect")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let ctx = session.context()?;
    app_state
        .auth_service
        .change_password(&ctx, &payload.current_password, &payload.new_password)
        .await?;

    // Every older token is revoked now, including the one used for this call.
    signed_in(
        &app_state,
        Identity {
            user_id: session.user.id,
            tenant_id: session.tenant.id,
            role: session.user.role,
            tenant_slug: session.tenant.slug,
        },
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/auth/tenant",
    tag = "Auth",
    responses(
        (status = 200, description = "The organization this host belongs to", body = TenantInfo),
        (status = 404, description = "Root domain or unknown subdomain")
    )
)]
pub async fn current_tenant(
    State(app_state): State<AppState>,
    TenantSlug(slug): TenantSlug,
) -> Result<Json<TenantInfo>, AppError> {
    let tenant = app_state
        .tenant_service
        .get_by_slug(&slug)
        .await?
        .ok_or(AppError::TenantNotFound)?;
    Ok(Json(tenant.into()))
}

#[utoipa::path(
    get,
    path = "/api/auth/slug-available",
    tag = "Auth",
    params(SlugQuery),
    responses((status = 200, description = "Whether the subdomain can be registered", body = SlugAvailability))
)]
pub async fn slug_available(
    State(app_state): State<AppState>,
    Query(query): Query<SlugQuery>,
) -> Result<Json<SlugAvailability>, AppError> {
    let slug = query.slug.trim().to_lowercase();
    let available = app_state.tenant_service.is_slug_available(&slug).await?;
    Ok(Json(SlugAvailability { slug, available }))
}
