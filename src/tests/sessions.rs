// src/tests/sessions.rs

use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{
        account::{OAuthProfile, OAuthTokens},
        auth::{Identity, UserRole},
    },
    services::auth::encode_session_token,
    tests::support::{context, signup, test_state, PASSWORD},
};

fn google_profile(account_id: &str, email: &str) -> OAuthProfile {
    OAuthProfile {
        provider_account_id: account_id.into(),
        email: Some(email.into()),
        name: Some("Grace".into()),
        tokens: OAuthTokens::default(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn password_change_revokes_older_sessions(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (tenant, owner) = signup(&state, "acme", "owner@acme.test").await;

    let identity = Identity {
        user_id: owner.id,
        tenant_id: tenant.id,
        role: owner.role,
        tenant_slug: tenant.slug.clone(),
    };
    let old_token =
        encode_session_token(&identity, &state.config.jwt_secret, Utc::now() - Duration::seconds(5))
            .unwrap();

    let session = state
        .auth_service
        .validate_session(&old_token, Some("acme"))
        .await
        .unwrap();
    assert_eq!(session.user.id, owner.id);
    assert_eq!(session.role(), UserRole::Owner);

    state
        .auth_service
        .change_password(&context(&owner), PASSWORD, "Newpass456")
        .await
        .unwrap();

    let err = state
        .auth_service
        .validate_session(&old_token, Some("acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let fresh = state.auth_service.issue_token(&identity).unwrap();
    assert!(state.auth_service.validate_session(&fresh, None).await.is_ok());

    let err = state
        .auth_service
        .authorize("owner@acme.test", PASSWORD, "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn wrong_current_password_is_a_field_error(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (_, owner) = signup(&state, "acme", "owner@acme.test").await;

    let err = state
        .auth_service
        .change_password(&context(&owner), "Wrongpass1", "Newpass456")
        .await
        .unwrap_err();
    match err {
        AppError::Validation { field_errors, .. } => assert!(field_errors.contains_key("currentPassword")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn suspended_tenant_sessions_stop_working(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (tenant, _) = signup(&state, "acme", "owner@acme.test").await;

    let identity = state
        .auth_service
        .authorize("owner@acme.test", PASSWORD, "acme")
        .await
        .unwrap();
    let token = state.auth_service.issue_token(&identity).unwrap();

    sqlx::query("UPDATE tenants SET is_suspended = TRUE WHERE id = $1")
        .bind(tenant.id)
        .execute(&state.db_pool)
        .await
        .unwrap();

    let err = state.auth_service.validate_session(&token, Some("acme")).await.unwrap_err();
    assert!(matches!(err, AppError::TenantSuspended));

    let err = state
        .auth_service
        .authorize("owner@acme.test", PASSWORD, "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TenantSuspended));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn external_account_stays_with_its_first_tenant(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (acme, _) = signup(&state, "acme", "owner@acme.test").await;
    signup(&state, "globex", "owner@globex.test").await;

    let profile = google_profile("g-123", "Grace@Example.test");

    let first = state
        .auth_service
        .authorize_oauth("google", &profile, "acme")
        .await
        .unwrap();
    assert_eq!(first.tenant_id, acme.id);
    assert_eq!(first.role, UserRole::Member);

    let again = state
        .auth_service
        .authorize_oauth("google", &profile, "acme")
        .await
        .unwrap();
    assert_eq!(again.user_id, first.user_id);

    let err = state
        .auth_service
        .authorize_oauth("google", &profile, "globex")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountLinkedToOtherTenant));

    // Created without a password: password sign-in is refused with a hint.
    let err = state
        .auth_service
        .authorize("grace@example.test", "Whatever1", "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OAuthOnlyUser));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn external_sign_in_links_an_existing_member(pool: PgPool) {
    let (state, _) = test_state(pool);
    let (_, owner) = signup(&state, "acme", "owner@acme.test").await;

    let identity = state
        .auth_service
        .authorize_oauth("google", &google_profile("g-owner", "owner@acme.test"), "acme")
        .await
        .unwrap();
    assert_eq!(identity.user_id, owner.id);
    assert_eq!(identity.role, UserRole::Owner);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reset_token_works_once(pool: PgPool) {
    let (state, _) = test_state(pool);
    signup(&state, "acme", "owner@acme.test").await;

    assert!(state
        .auth_service
        .request_password_reset("nobody@acme.test", "acme")
        .await
        .unwrap()
        .is_none());

    let (_, tenant, token) = state
        .auth_service
        .request_password_reset("owner@acme.test", "acme")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tenant.slug, "acme");

    state.auth_service.reset_password(&token, "Newpass456").await.unwrap();
    assert!(state.auth_service.reset_password(&token, "Other7890").await.is_err());

    state
        .auth_service
        .authorize("owner@acme.test", "Newpass456", "acme")
        .await
        .unwrap();
}
