// src/tests/tenant_routing.rs

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::ServiceExt;

use crate::{
    config::Config,
    middleware::tenancy::{resolve_tenant, MaybeTenantSlug, TENANT_SLUG_HEADER},
    tests::support::{host, offline_state, test_config},
};

async fn echo_tenant(headers: HeaderMap, MaybeTenantSlug(slug): MaybeTenantSlug) -> String {
    let header = headers
        .get(&TENANT_SLUG_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    format!("{}|{}", header, slug.unwrap_or_else(|| "-".into()))
}

fn router(config: Config) -> Router {
    Router::new()
        .route("/echo", get(echo_tenant))
        .layer(from_fn_with_state(Arc::new(config), resolve_tenant))
}

fn localhost_config() -> Config {
    let vars = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("JWT_SECRET", "test-secret-test-secret-test-secret"),
    ]);
    Config::from_map(&vars).unwrap()
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cookie, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn subdomain_becomes_header_and_extension() {
    let request = Request::builder()
        .uri("/echo")
        .header(header::HOST, host("acme"))
        .body(Body::empty())
        .unwrap();

    let (status, cookie, body) = call(router(test_config()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "acme|acme");
    assert!(cookie.is_none());
}

#[tokio::test]
async fn client_supplied_tenant_header_is_dropped() {
    let request = Request::builder()
        .uri("/echo")
        .header(header::HOST, "example.test")
        .header("x-tenant-slug", "globex")
        .body(Body::empty())
        .unwrap();

    let (_, _, body) = call(router(test_config()), request).await;
    assert_eq!(body, "-|-");
}

#[tokio::test]
async fn query_hint_on_loopback_sets_tenant_cookie() {
    let request = Request::builder()
        .uri("/echo?tenant=acme")
        .header(header::HOST, "localhost:3000")
        .body(Body::empty())
        .unwrap();

    let (_, cookie, body) = call(router(localhost_config()), request).await;
    assert_eq!(body, "acme|acme");
    let cookie = cookie.unwrap();
    assert!(cookie.starts_with("tenant=acme;"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn loopback_falls_back_to_tenant_cookie() {
    let request = Request::builder()
        .uri("/echo")
        .header(header::HOST, "127.0.0.1:3000")
        .header(header::COOKIE, "tenant=globex")
        .body(Body::empty())
        .unwrap();

    let (_, _, body) = call(router(localhost_config()), request).await;
    assert_eq!(body, "globex|globex");
}

#[tokio::test]
async fn query_hint_is_ignored_on_real_hosts() {
    let request = Request::builder()
        .uri("/echo?tenant=globex")
        .header(header::HOST, host("acme"))
        .body(Body::empty())
        .unwrap();

    let (_, cookie, body) = call(router(test_config()), request).await;
    assert_eq!(body, "acme|acme");
    assert!(cookie.is_none());
}

#[tokio::test]
async fn root_domain_has_no_current_tenant() {
    let request = Request::builder()
        .uri("/api/auth/tenant")
        .header(header::HOST, "example.test")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(crate::app(offline_state(test_config())), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("TenantNotFound"), "{body}");
}
