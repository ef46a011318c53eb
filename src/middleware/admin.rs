// src/middleware/admin.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    common::{cookies::ADMIN_SESSION_COOKIE, error::AppError},
    config::AppState,
    models::admin::AdminUser,
    services::admin_auth::require_primary,
};

// Platform admin routes only; tenant sessions are never accepted here.
pub async fn admin_guard(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(ADMIN_SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Admin session required.".into()))?;

    let admin = app_state
        .admin_auth_service
        .validate(&token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Admin session expired. Please sign in again.".into()))?;

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

pub struct CurrentAdmin(pub AdminUser);

impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminUser>()
            .cloned()
            .map(CurrentAdmin)
            .ok_or_else(|| AppError::Unauthorized("Admin session required.".into()))
    }
}

/// Like [`CurrentAdmin`], but rejects anyone who is not a primary admin.
pub struct RequirePrimaryAdmin(pub AdminUser);

impl<S> FromRequestParts<S> for RequirePrimaryAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentAdmin(admin) = CurrentAdmin::from_request_parts(parts, state).await?;
        require_primary(&admin)?;
        Ok(RequirePrimaryAdmin(admin))
    }
}
