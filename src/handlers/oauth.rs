// src/handlers/oauth.rs

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::auth::session_cookie,
    middleware::tenancy::MaybeTenantSlug,
    models::account::{OAuthCallbackQuery, OAuthStartQuery},
    services::oauth_provider::redirect_uri,
};

const GENERIC_REASON: &str = "OAuthError";

fn login_error(app_state: &AppState, tenant_slug: Option<&str>, reason: &str) -> Response {
    let path = format!("/login?error={}", urlencoding::encode(reason));
    let target = match tenant_slug {
        Some(slug) => app_state.config.tenant_path_url(slug, &path),
        None => path,
    };
    Redirect::to(&target).into_response()
}

fn reason_for(err: &AppError) -> &'static str {
    err.code().unwrap_or(GENERIC_REASON)
}

/// Sends the browser to the provider. The tenant rides along in the signed `state`.
pub async fn start(
    State(app_state): State<AppState>,
    Path(provider_id): Path<String>,
    MaybeTenantSlug(host_tenant): MaybeTenantSlug,
    Query(query): Query<OAuthStartQuery>,
) -> Response {
    let tenant_slug = host_tenant.or(query.tenant.clone());

    let Some(provider) = app_state.oauth_providers.get(&provider_id) else {
        return login_error(&app_state, tenant_slug.as_deref(), "OAuthProviderUnavailable");
    };
    let Some(tenant_slug) = tenant_slug else {
        return login_error(&app_state, None, "TenantNotFound");
    };

    let callback_url = query
        .callback_url
        .as_deref()
        .filter(|u| app_state.config.is_tenant_url(u, &tenant_slug));
    let state = app_state.state_codec.encode(&tenant_slug, callback_url);

    let url = provider.authorize_url(&state, &redirect_uri(&app_state.config, provider.id()));
    Redirect::to(&url).into_response()
}

/// Provider redirect target. Every failure ends on the login page with a reason code.
pub async fn callback(
    State(app_state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    let state = match app_state.state_codec.decode(query.state.as_deref()) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Rejected OAuth callback: {}", e);
            return login_error(&app_state, None, "InvalidState");
        }
    };
    let tenant_slug = state.tenant_slug.as_str();

    if let Some(error) = &query.error {
        tracing::warn!(provider = %provider_id, "Provider returned an error: {}", error);
        return login_error(&app_state, Some(tenant_slug), GENERIC_REASON);
    }

    let Some(provider) = app_state.oauth_providers.get(&provider_id) else {
        return login_error(&app_state, Some(tenant_slug), "OAuthProviderUnavailable");
    };
    let Some(code) = query.code.as_deref() else {
        return login_error(&app_state, Some(tenant_slug), GENERIC_REASON);
    };

    let profile = match provider
        .exchange(code, &redirect_uri(&app_state.config, provider.id()))
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(provider = %provider_id, "OAuth code exchange failed: {:?}", e);
            return login_error(&app_state, Some(tenant_slug), GENERIC_REASON);
        }
    };

    let identity = match app_state
        .auth_service
        .authorize_oauth(provider.id(), &profile, tenant_slug)
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!("OAuth sign-in failed: {:?}", e);
            }
            return login_error(&app_state, Some(tenant_slug), reason_for(&e));
        }
    };

    let signed = app_state
        .auth_service
        .issue_token(&identity)
        .and_then(|token| session_cookie(&app_state.config, &token));

    match signed {
        Ok(cookie) => {
            let target = state
                .callback_url
                .clone()
                .filter(|u| app_state.config.is_tenant_url(u, &identity.tenant_slug))
                .unwrap_or_else(|| app_state.config.tenant_url(&identity.tenant_slug));
            tracing::info!(tenant = %identity.tenant_slug, provider = %provider_id, "User signed in with provider");
            ([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response()
        }
        Err(e) => {
            tracing::error!("Could not issue session after OAuth sign-in: {:?}", e);
            login_error(&app_state, Some(tenant_slug), GENERIC_REASON)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reasons_come_from_error_codes() {
        assert_eq!(reason_for(&AppError::AccountLinkedToOtherTenant), "AccountLinkedToOtherTenant");
        assert_eq!(reason_for(&AppError::TenantSuspended), "TenantSuspended");
        assert_eq!(reason_for(&AppError::InvalidCredentials), GENERIC_REASON);
    }
}
