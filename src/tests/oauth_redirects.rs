// src/tests/oauth_redirects.rs

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use crate::{
    config::{AppState, Config},
    services::oauth_state::OAuthState,
    tests::support::{host, offline_state, ROOT_DOMAIN},
};

fn google_state() -> AppState {
    let vars = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("JWT_SECRET", "test-secret-test-secret-test-secret"),
        ("ROOT_DOMAIN", ROOT_DOMAIN),
        ("APP_ENV", "test"),
        ("GOOGLE_CLIENT_ID", "client-id"),
        ("GOOGLE_CLIENT_SECRET", "client-secret"),
    ]);
    // Starting a sign-in never touches the database.
    offline_state(Config::from_map(&vars).unwrap())
}

/// Follows `/start` and decodes the signed state handed to the provider.
async fn start_with(state: &AppState, callback_url: &str) -> OAuthState {
    let uri = format!(
        "/api/auth/oauth/google/start?callbackUrl={}",
        urlencoding::encode(callback_url)
    );
    let request = Request::builder()
        .uri(uri)
        .header(header::HOST, host("acme"))
        .body(Body::empty())
        .unwrap();

    let response = crate::app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let location = url::Url::parse(&location).unwrap();
    let raw_state = location
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    state.state_codec.decode(Some(&raw_state)).unwrap()
}

#[tokio::test]
async fn foreign_callback_url_is_dropped() {
    let state = google_state();

    let signed = start_with(&state, "https://evil.attacker.net/phish").await;

    assert_eq!(signed.tenant_slug, "acme");
    assert_eq!(signed.callback_url, None);
}

#[tokio::test]
async fn another_tenants_host_is_not_a_callback() {
    let state = google_state();

    let signed = start_with(&state, &format!("http://{}/dashboard", host("globex"))).await;

    assert_eq!(signed.callback_url, None);
}

#[tokio::test]
async fn own_tenant_callback_url_is_kept() {
    let state = google_state();
    let target = format!("http://{}/dashboard", host("acme"));

    let signed = start_with(&state, &target).await;

    assert_eq!(signed.callback_url.as_deref(), Some(target.as_str()));
}
