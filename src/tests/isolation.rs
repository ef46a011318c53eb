// src/tests/isolation.rs

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app,
    common::error::AppError,
    models::todo::{CreateTodoPayload, UpdateTodoPayload},
    tests::support::{context, host, signup, test_state, PASSWORD},
};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn todos_never_cross_tenants(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (_, acme_owner) = signup(&state, "acme", "owner@acme.test").await;
    let (_, globex_owner) = signup(&state, "globex", "owner@globex.test").await;
    let acme = context(&acme_owner);
    let globex = context(&globex_owner);

    let todo = state
        .todo_service
        .create(&acme, &CreateTodoPayload { title: "  Ship it  ".into() })
        .await
        .unwrap();
    assert_eq!(todo.title, "Ship it");
    assert_eq!(todo.tenant_id, acme_owner.tenant_id);

    assert!(state.todo_service.list(&globex).await.unwrap().is_empty());

    let err = state.todo_service.get_by_id(&globex, todo.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = state
        .todo_service
        .update(
            &globex,
            todo.id,
            &UpdateTodoPayload { title: Some("hijacked".into()), completed: None },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = state.todo_service.toggle(&globex, todo.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = state.todo_service.delete(&globex, todo.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = state.todo_service.get_by_id(&acme, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let untouched = state.todo_service.get_by_id(&acme, todo.id).await.unwrap();
    assert_eq!(untouched.title, "Ship it");
    assert!(!untouched.completed);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn same_email_lives_in_two_tenants(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (acme, _) = signup(&state, "acme", "shared@example.test").await;
    let (globex, _) = signup(&state, "globex", "shared@example.test").await;

    let a = state
        .auth_service
        .authorize("shared@example.test", PASSWORD, "acme")
        .await
        .unwrap();
    let b = state
        .auth_service
        .authorize("shared@example.test", PASSWORD, "globex")
        .await
        .unwrap();

    assert_eq!(a.tenant_id, acme.id);
    assert_eq!(b.tenant_id, globex.id);
    assert_ne!(a.user_id, b.user_id);

    let err = state
        .auth_service
        .authorize("shared@example.test", PASSWORD, "initech")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn token_from_one_tenant_is_refused_on_another_host(pool: PgPool) {
    let (state, mail) = test_state(pool);
    let router = app(state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/auth/signup")
                .header(header::HOST, "example.test")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Ada Owner",
                        "email": "ada@acme.test",
                        "password": PASSWORD,
                        "confirmPassword": PASSWORD,
                        "tenantName": "Acme",
                        "tenantSlug": "acme"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(mail.recipients(), vec!["ada@acme.test".to_string()]);

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/auth/login")
                .header(header::HOST, host("acme"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "ada@acme.test", "password": PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let token = json_body(response).await["token"].as_str().unwrap().to_string();

    let todos = |slug: &str| {
        Request::get("/api/todos")
            .header(header::HOST, host(slug))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let response = router.clone().oneshot(todos("acme")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    signup(&state, "globex", "owner@globex.test").await;
    let response = router.clone().oneshot(todos("globex")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(
            Request::get("/api/todos")
                .header(header::HOST, host("acme"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn subdomain_shows_its_own_organization(pool: PgPool) {
    let (state, _) = test_state(pool);
    signup(&state, "acme", "owner@acme.test").await;
    let router = app(state);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/auth/tenant")
                .header(header::HOST, host("acme"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["slug"], "acme");
    assert_eq!(body["name"], "acme Inc");
    assert_eq!(body["isSuspended"], false);

    let response = router
        .oneshot(
            Request::get("/api/auth/tenant")
                .header(header::HOST, host("nobody"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn change_password_over_http_hands_back_a_working_session(pool: PgPool) {
    let (state, _) = test_state(pool);
    signup(&state, "acme", "owner@acme.test").await;
    let router = app(state.clone());

    let post_json = |uri: &str, token: Option<&str>, body: Value| {
        let mut request = Request::post(uri)
            .header(header::HOST, host("acme"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        request.body(Body::from(body.to_string())).unwrap()
    };

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            None,
            json!({ "email": "owner@acme.test", "password": PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let old_token = json_body(response).await["token"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/change-password",
            Some(&old_token),
            json!({
                "currentPassword": PASSWORD,
                "newPassword": "Newpass456",
                "confirmPassword": "Newpass456"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let body = json_body(response).await;
    assert_eq!(body["tenantSlug"], "acme");
    let new_token = body["token"].as_str().unwrap().to_string();

    let response = router
        .oneshot(
            Request::get("/api/users/me")
                .header(header::HOST, host("acme"))
                .header(header::AUTHORIZATION, format!("Bearer {new_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state
        .auth_service
        .authorize("owner@acme.test", "Newpass456", "acme")
        .await
        .unwrap();
}
