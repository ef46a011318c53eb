// src/tests/support.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    config::{AppState, Config},
    models::{
        auth::{SignupPayload, User},
        tenancy::Tenant,
    },
    services::{
        mail::{EmailMessage, MailClient},
        scope::Context,
    },
};

pub const ROOT_DOMAIN: &str = "example.test";
pub const PASSWORD: &str = "Secret123";

pub fn test_config() -> Config {
    let vars = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("JWT_SECRET", "test-secret-test-secret-test-secret"),
        ("ROOT_DOMAIN", ROOT_DOMAIN),
        ("APP_ENV", "test"),
        ("BCRYPT_COST", "4"),
    ]);
    Config::from_map(&vars).unwrap()
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMail {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMail {
    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }
}

#[async_trait::async_trait]
impl MailClient for RecordingMail {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub fn test_state(pool: PgPool) -> (AppState, Arc<RecordingMail>) {
    let mail = Arc::new(RecordingMail::default());
    let state = AppState::build(pool, test_config(), mail.clone()).unwrap();
    (state, mail)
}

/// State for router tests that never reach the database; the pool connects lazily.
pub fn offline_state(config: Config) -> AppState {
    let pool = PgPoolOptions::new().connect_lazy("postgres://unused").unwrap();
    AppState::build(pool, config, Arc::new(RecordingMail::default())).unwrap()
}

pub async fn signup(state: &AppState, slug: &str, email: &str) -> (Tenant, User) {
    state
        .tenant_service
        .signup(&SignupPayload {
            name: "Owner".into(),
            email: email.into(),
            password: PASSWORD.into(),
            confirm_password: PASSWORD.into(),
            tenant_name: format!("{slug} Inc"),
            tenant_slug: slug.into(),
        })
        .await
        .unwrap()
}

pub fn context(user: &User) -> Context {
    Context::new(user.tenant_id, user.id).unwrap()
}

pub fn host(slug: &str) -> String {
    format!("{slug}.{ROOT_DOMAIN}")
}
