//src/main.rs

use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

#[cfg(test)]
mod tests;

use crate::{
    config::{AppState, Config},
    db::{AdminSessionRepository, InvitationRepository, PasswordResetRepository},
    docs::ApiDoc,
    middleware::{admin::admin_guard, auth::auth_guard, tenancy::resolve_tenant},
    services::maintenance::Maintenance,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let maintenance_interval = Duration::from_secs(config.maintenance_interval_secs);

    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("Database migrations applied");

    Maintenance::new(
        AdminSessionRepository::new(app_state.db_pool.clone()),
        InvitationRepository::new(app_state.db_pool.clone()),
        PasswordResetRepository::new(app_state.db_pool.clone()),
    )
    .spawn(maintenance_interval);

    let app = app(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(tenant_api(app_state.clone()))
        .nest("/api/admin", admin_api(app_state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

/// Everything a tenant user reaches. Tenant resolution wraps all of it.
fn tenant_api(app_state: AppState) -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password))
        .route("/slug-available", get(handlers::auth::slug_available))
        .route("/tenant", get(handlers::auth::current_tenant))
        .route("/oauth/{provider}/start", get(handlers::oauth::start))
        .route("/oauth/{provider}/callback", get(handlers::oauth::callback));

    let session_routes = Router::new()
        .route("/api/auth/change-password", post(handlers::auth::change_password))
        .route(
            "/api/users/me",
            get(handlers::users::get_me).patch(handlers::users::update_me),
        )
        .route("/api/team", get(handlers::users::list_team))
        .route("/api/tenant", patch(handlers::users::update_tenant))
        .route(
            "/api/todos",
            get(handlers::todos::list_todos).post(handlers::todos::create_todo),
        )
        .route(
            "/api/todos/{id}",
            get(handlers::todos::get_todo)
                .patch(handlers::todos::update_todo)
                .delete(handlers::todos::delete_todo),
        )
        .route("/api/todos/{id}/toggle", post(handlers::todos::toggle_todo))
        .route(
            "/api/invitations",
            get(handlers::invitations::list_invitations).post(handlers::invitations::create_invitation),
        )
        .route("/api/invitations/{id}", delete(handlers::invitations::revoke_invitation))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route(
            "/api/invitations/accept",
            get(handlers::invitations::preview_invitation)
                .post(handlers::invitations::accept_invitation),
        )
        .merge(session_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.config.clone(),
            resolve_tenant,
        ))
}

/// Platform admin panel. Separate cookie, separate session store, no tenant resolution.
fn admin_api(app_state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(handlers::admin_auth::me))
        .route(
            "/admins",
            get(handlers::admin::list_admins).post(handlers::admin::create_admin),
        )
        .route("/admins/{id}", delete(handlers::admin::delete_admin))
        .route("/tenants", get(handlers::admin::list_tenants))
        .route(
            "/tenants/{id}",
            get(handlers::admin::get_tenant)
                .patch(handlers::admin::update_tenant)
                .delete(handlers::admin::delete_tenant),
        )
        .route("/users", get(handlers::admin::list_users))
        .route("/users/{id}", get(handlers::admin::get_user))
        .route(
            "/users/{id}/reset-password",
            post(handlers::admin::reset_user_password),
        )
        .route("/audit-logs", get(handlers::admin::list_audit_logs))
        .route("/dashboard/stats", get(handlers::admin::dashboard_stats))
        .route_layer(axum_middleware::from_fn_with_state(app_state, admin_guard));

    Router::new()
        .route("/auth/login", post(handlers::admin_auth::login))
        .route("/auth/logout", post(handlers::admin_auth::logout))
        .route(
            "/auth/setup",
            get(handlers::admin_auth::validate_setup).post(handlers::admin_auth::complete_setup),
        )
        .merge(protected)
}
