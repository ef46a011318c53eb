// src/tests/admin_panel.rs

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    config::AppState,
    db::AdminRepository,
    models::{
        admin::{AdminRole, AdminUser, CreateAdminPayload, PageQuery},
        tenancy::AdminUpdateTenantPayload,
    },
    services::{admin_auth::MAX_FAILED_ATTEMPTS, password::PasswordHasher},
    tests::support::{signup, test_state, PASSWORD},
};

async fn seed_admin(state: &AppState, email: &str, role: AdminRole) -> AdminUser {
    let hash = PasswordHasher::new(4).hash(PASSWORD).await.unwrap();
    AdminRepository::new(state.db_pool.clone())
        .create(&state.db_pool, email, "Root", Some(&hash), role)
        .await
        .unwrap()
}

fn new_admin(email: &str) -> CreateAdminPayload {
    CreateAdminPayload {
        email: email.into(),
        name: "Helper".into(),
        password: None,
        role: AdminRole::Admin,
    }
}

async fn audit_actions(state: &AppState) -> Vec<String> {
    sqlx::query_scalar("SELECT action FROM audit_logs ORDER BY created_at, action")
        .fetch_all(&state.db_pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn repeated_failures_lock_the_account(pool: PgPool) {
    let (state, _) = test_state(pool);
    seed_admin(&state, "root@platform.test", AdminRole::PrimaryAdmin).await;

    for attempt in 1..=MAX_FAILED_ATTEMPTS {
        let err = state
            .admin_auth_service
            .login("root@platform.test", "Wrongpass1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let locked_until: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT locked_until FROM admin_users WHERE email = 'root@platform.test'")
                .fetch_one(&state.db_pool)
                .await
                .unwrap();
        if attempt < MAX_FAILED_ATTEMPTS {
            assert!(locked_until.is_none(), "locked after {attempt} failures");
        } else {
            let until = locked_until.unwrap();
            assert!(until > Utc::now() + Duration::minutes(29));
            assert!(until <= Utc::now() + Duration::minutes(30));
        }
    }

    // Even the right password is refused while locked.
    let err = state
        .admin_auth_service
        .login("root@platform.test", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Locked));

    sqlx::query("UPDATE admin_users SET locked_until = NOW() - INTERVAL '1 minute'")
        .execute(&state.db_pool)
        .await
        .unwrap();

    let (admin, session) = state
        .admin_auth_service
        .login("root@platform.test", PASSWORD)
        .await
        .unwrap();
    assert_eq!(session.admin_id, admin.id);

    let attempts: i32 = sqlx::query_scalar("SELECT failed_login_attempts FROM admin_users WHERE id = $1")
        .bind(admin.id)
        .fetch_one(&state.db_pool)
        .await
        .unwrap();
    assert_eq!(attempts, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sessions_validate_and_end_on_logout(pool: PgPool) {
    let (state, _) = test_state(pool);
    let root = seed_admin(&state, "root@platform.test", AdminRole::PrimaryAdmin).await;

    let (_, session) = state
        .admin_auth_service
        .login("root@platform.test", PASSWORD)
        .await
        .unwrap();

    let current = state.admin_auth_service.validate(&session.token).await.unwrap();
    assert_eq!(current.map(|a| a.id), Some(root.id));

    state.admin_auth_service.logout(&session.token).await.unwrap();
    assert!(state.admin_auth_service.validate(&session.token).await.unwrap().is_none());

    // Idle past the limit: the row is dropped on the next check.
    let (_, idle) = state
        .admin_auth_service
        .login("root@platform.test", PASSWORD)
        .await
        .unwrap();
    sqlx::query("UPDATE admin_sessions SET last_activity_at = NOW() - INTERVAL '31 minutes' WHERE id = $1")
        .bind(idle.id)
        .execute(&state.db_pool)
        .await
        .unwrap();
    assert!(state.admin_auth_service.validate(&idle.token).await.unwrap().is_none());

    let actions = audit_actions(&state).await;
    assert_eq!(actions.iter().filter(|a| *a == "admin.login").count(), 2);
    assert!(actions.contains(&"admin.logout".to_string()));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deactivated_admin_cannot_sign_in_and_loses_live_sessions(pool: PgPool) {
    let (state, _) = test_state(pool);
    let helper = seed_admin(&state, "helper@platform.test", AdminRole::Admin).await;

    let (_, session) = state
        .admin_auth_service
        .login("helper@platform.test", PASSWORD)
        .await
        .unwrap();
    assert!(state.admin_auth_service.validate(&session.token).await.unwrap().is_some());

    sqlx::query("UPDATE admin_users SET is_active = FALSE WHERE id = $1")
        .bind(helper.id)
        .execute(&state.db_pool)
        .await
        .unwrap();

    assert!(state.admin_auth_service.validate(&session.token).await.unwrap().is_none());

    let err = state
        .admin_auth_service
        .login("helper@platform.test", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Deactivated));
    assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);

    // Refusals of an inactive account do not count towards the lock.
    let attempts: i32 = sqlx::query_scalar("SELECT failed_login_attempts FROM admin_users WHERE id = $1")
        .bind(helper.id)
        .fetch_one(&state.db_pool)
        .await
        .unwrap();
    assert_eq!(attempts, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn setup_link_is_single_use_within_48_hours(pool: PgPool) {
    let (state, _) = test_state(pool);
    let root = seed_admin(&state, "root@platform.test", AdminRole::PrimaryAdmin).await;

    let (helper, token) = state
        .admin_auth_service
        .create_admin(&root, &new_admin("helper@platform.test"))
        .await
        .unwrap();
    let token = token.unwrap();

    let info = state.admin_auth_service.validate_setup_token(&token).await.unwrap();
    assert_eq!(info.email, "helper@platform.test");

    let almost_expired = Utc::now() + Duration::hours(47) + Duration::minutes(59);
    state
        .admin_auth_service
        .complete_setup_at(&token, "Helper1234", almost_expired)
        .await
        .unwrap();

    let err = state
        .admin_auth_service
        .complete_setup_at(&token, "Helper5678", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let (admin, _) = state
        .admin_auth_service
        .login("helper@platform.test", "Helper1234")
        .await
        .unwrap();
    assert_eq!(admin.id, helper.id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn setup_link_expires(pool: PgPool) {
    let (state, _) = test_state(pool);
    let root = seed_admin(&state, "root@platform.test", AdminRole::PrimaryAdmin).await;

    let (_, token) = state
        .admin_auth_service
        .create_admin(&root, &new_admin("late@platform.test"))
        .await
        .unwrap();

    let too_late = Utc::now() + Duration::hours(48) + Duration::minutes(1);
    let err = state
        .admin_auth_service
        .complete_setup_at(&token.unwrap(), "Helper1234", too_late)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn last_primary_admin_stays(pool: PgPool) {
    let (state, _) = test_state(pool);
    let root = seed_admin(&state, "root@platform.test", AdminRole::PrimaryAdmin).await;
    let plain = seed_admin(&state, "plain@platform.test", AdminRole::Admin).await;

    let err = state.admin_auth_service.delete_admin(&root, root.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = state.admin_auth_service.delete_admin(&plain, root.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let second = seed_admin(&state, "second@platform.test", AdminRole::PrimaryAdmin).await;
    state.admin_auth_service.delete_admin(&second, root.id).await.unwrap();

    state.admin_auth_service.delete_admin(&second, plain.id).await.unwrap();
    assert_eq!(state.admin_auth_service.list_admins().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tenant_changes_are_audited(pool: PgPool) {
    let (state, _) = test_state(pool);
    let root = seed_admin(&state, "root@platform.test", AdminRole::PrimaryAdmin).await;
    let (tenant, _) = signup(&state, "acme", "owner@acme.test").await;

    let page = state
        .platform_service
        .list_tenants(&PageQuery { page: None, limit: None })
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.items[0].user_count, 1);

    let updated = state
        .platform_service
        .update_tenant(
            &root,
            tenant.id,
            &AdminUpdateTenantPayload {
                is_suspended: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.is_suspended);

    let err = state
        .auth_service
        .authorize("owner@acme.test", PASSWORD, "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TenantSuspended));

    state.platform_service.delete_tenant(&root, tenant.id).await.unwrap();
    assert_eq!(state.platform_service.stats().await.unwrap().total_users, 0);

    let actions = audit_actions(&state).await;
    for expected in ["tenant.update", "tenant.suspend", "tenant.delete"] {
        assert!(actions.contains(&expected.to_string()), "missing {expected}");
    }

    let log = state
        .platform_service
        .list_audit_logs(&PageQuery { page: Some(1), limit: Some(2) })
        .await
        .unwrap();
    assert_eq!(log.items.len(), 2);
    assert_eq!(log.pagination.total, 3);
    assert!(log.items.iter().all(|e| e.admin_email == "root@platform.test"));
}
