// src/middleware/tenancy.rs

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    common::{
        cookies::{CookieSpec, TENANT_COOKIE},
        error::AppError,
    },
    config::Config,
    models::tenancy::validate_tenant_slug,
    services::tenant_resolver::{self, DevHints, TenantResolution},
};

pub const TENANT_SLUG_HEADER: HeaderName = HeaderName::from_static("x-tenant-slug");

const TENANT_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Runs on every request: host (plus dev hints on loopback) to tenant slug.
/// The result lands in the request extensions and, when a tenant was found,
/// in the `x-tenant-slug` request header.
pub async fn resolve_tenant(
    State(config): State<Arc<Config>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    let query_tenant = request.uri().query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "tenant")
            .map(|(_, value)| value.into_owned())
    });
    let cookie_tenant = jar.get(TENANT_COOKIE).map(|c| c.value().to_string());

    let resolution = tenant_resolver::resolve(
        &host,
        &config.root_domain,
        DevHints {
            query_tenant: query_tenant.as_deref(),
            cookie_tenant: cookie_tenant.as_deref(),
        },
    );

    // Whatever the client sent is never trusted.
    request.headers_mut().remove(&TENANT_SLUG_HEADER);
    if let Some(slug) = &resolution.tenant_slug {
        if let Ok(value) = HeaderValue::from_str(slug) {
            request.headers_mut().insert(TENANT_SLUG_HEADER, value);
        }
    }
    request.extensions_mut().insert(resolution.clone());

    let mut response = next.run(request).await;

    // Loopback has no subdomains, so the choice is remembered in a cookie.
    let on_loopback = tenant_resolver::is_loopback(tenant_resolver::strip_port(&host));
    if let (true, Some(slug)) = (on_loopback, resolution.tenant_slug.as_deref()) {
        if validate_tenant_slug(slug).is_ok() {
            let cookie = CookieSpec {
                name: TENANT_COOKIE,
                value: slug,
                max_age_secs: Some(TENANT_COOKIE_MAX_AGE_SECS),
                domain: None,
                secure: false,
            };
            match cookie.to_header() {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::warn!("Could not set tenant cookie: {:?}", e),
            }
        }
    }

    response
}

/// The tenant slug of the current request; 404 `TenantNotFound` on the root domain.
#[derive(Debug, Clone)]
pub struct TenantSlug(pub String);

impl<S> FromRequestParts<S> for TenantSlug
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantResolution>()
            .and_then(|r| r.tenant_slug.clone())
            .map(TenantSlug)
            .ok_or(AppError::TenantNotFound)
    }
}

/// Same as [`TenantSlug`] but never rejects.
#[derive(Debug, Clone)]
pub struct MaybeTenantSlug(pub Option<String>);

impl<S> FromRequestParts<S> for MaybeTenantSlug
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeTenantSlug(
            parts
                .extensions
                .get::<TenantResolution>()
                .and_then(|r| r.tenant_slug.clone()),
        ))
    }
}
