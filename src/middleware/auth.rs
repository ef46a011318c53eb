// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    common::{cookies::SESSION_COOKIE, error::AppError},
    config::AppState,
    services::{auth::Session, scope::Context, tenant_resolver::TenantResolution},
};

/// `Authorization: Bearer <jwt>` first, then the `session_token` cookie.
pub fn session_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar.get(SESSION_COOKIE).map(|c| c.value().to_string()),
    }
}

// Validates the session against the tenant resolved from the host.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers(), &jar).ok_or(AppError::InvalidToken)?;

    let host_tenant = request
        .extensions()
        .get::<TenantResolution>()
        .and_then(|r| r.tenant_slug.clone());

    let session = app_state
        .auth_service
        .validate_session(&token, host_tenant.as_deref())
        .await?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Extractor for the validated session inside protected handlers.
pub struct AuthenticatedUser(pub Session);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}

impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .ok_or(AppError::InvalidToken)?
            .context()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    use super::*;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "cookie-token"));

        assert_eq!(session_token(&headers, &jar).as_deref(), Some("header-token"));
        assert_eq!(session_token(&HeaderMap::new(), &jar).as_deref(), Some("cookie-token"));
        assert_eq!(session_token(&HeaderMap::new(), &CookieJar::new()), None);
    }
}
