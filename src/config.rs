// src/config.rs

use std::{collections::HashMap, env, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        AccountRepository, AdminRepository, AdminSessionRepository, AuditRepository,
        InvitationRepository, PasswordResetRepository, TenantRepository, TodoRepository,
        UserRepository,
    },
    services::{
        admin_auth::AdminAuthService,
        audit::AuditLogger,
        auth::AuthService,
        invitation_service::InvitationService,
        mail::{self, DynMailClient},
        oauth_provider::{self, OAuthProviders},
        oauth_state::StateCodec,
        password::PasswordHasher,
        platform_service::PlatformService,
        tenancy_service::TenantService,
        todo_service::TodoService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub oauth_state_secret: String,
    pub root_domain: String,
    pub protocol: String,
    pub app_env: AppEnv,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub bcrypt_cost: u32,
    pub smtp: Option<SmtpConfig>,
    pub email_from: String,
    pub google: Option<GoogleOAuthConfig>,
    pub maintenance_interval_secs: u64,
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters");
        }
        let oauth_state_secret = lookup("OAUTH_STATE_SECRET").unwrap_or_else(|| jwt_secret.clone());

        let protocol = lookup("PROTOCOL").unwrap_or_else(|| "http".into());
        if protocol != "http" && protocol != "https" {
            bail!("PROTOCOL must be http or https, got {protocol}");
        }

        let app_env = match lookup("APP_ENV").as_deref() {
            None | Some("development") => AppEnv::Development,
            Some("production") => AppEnv::Production,
            Some("test") => AppEnv::Test,
            Some(other) => bail!("APP_ENV must be development, production or test, got {other}"),
        };

        let smtp = match lookup("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: lookup("SMTP_USER").context("SMTP_USER must be set when SMTP_HOST is")?,
                password: lookup("SMTP_PASS").context("SMTP_PASS must be set when SMTP_HOST is")?,
            }),
            None => None,
        };

        let google = match (lookup("GOOGLE_CLIENT_ID"), lookup("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            oauth_state_secret,
            root_domain: lookup("ROOT_DOMAIN").unwrap_or_else(|| "localhost:3000".into()),
            protocol,
            app_env,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", 12)?,
            smtp,
            email_from: lookup("EMAIL_FROM").unwrap_or_else(|| "noreply@example.com".into()),
            google,
            maintenance_interval_secs: parse_or(&lookup, "MAINTENANCE_INTERVAL_SECS", 3600)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    /// Local development: tenants come from `?tenant=` / the `tenant` cookie.
    pub fn is_localhost(&self) -> bool {
        self.root_domain.contains("localhost") || self.root_domain.starts_with("127.0.0.1")
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.root_domain)
    }

    pub fn tenant_url(&self, tenant_slug: &str) -> String {
        if self.is_localhost() {
            format!("{}?tenant={}", self.base_url(), tenant_slug)
        } else {
            format!("{}://{}.{}", self.protocol, tenant_slug, self.root_domain)
        }
    }

    /// Link to `path` (which may carry a query) on the tenant's host.
    pub fn tenant_path_url(&self, tenant_slug: &str, path: &str) -> String {
        if self.is_localhost() {
            let sep = if path.contains('?') { '&' } else { '?' };
            format!("{}{}{}tenant={}", self.base_url(), path, sep, tenant_slug)
        } else {
            format!("{}://{}.{}{}", self.protocol, tenant_slug, self.root_domain, path)
        }
    }

    /// True when `raw` lives on the root host or on `tenant_slug`'s own subdomain.
    pub fn is_tenant_url(&self, raw: &str, tenant_slug: &str) -> bool {
        let Ok(url) = url::Url::parse(raw) else {
            return false;
        };
        if url.scheme() != self.protocol {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let root = self.root_domain.to_ascii_lowercase();
        authority == root || authority == format!("{}.{}", tenant_slug.to_ascii_lowercase(), root)
    }

    pub fn uses_https(&self) -> bool {
        self.protocol == "https"
    }

    /// Cookie domain shared by every tenant subdomain (none on loopback).
    pub fn cookie_domain(&self) -> Option<String> {
        if self.is_localhost() {
            None
        } else {
            let host = self.root_domain.split(':').next().unwrap_or(&self.root_domain);
            Some(format!(".{host}"))
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is not valid: {raw}")),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub mail: DynMailClient,
    pub oauth_providers: OAuthProviders,
    pub state_codec: StateCodec,
    pub tenant_service: TenantService,
    pub auth_service: AuthService,
    pub todo_service: TodoService,
    pub invitation_service: InvitationService,
    pub admin_auth_service: AdminAuthService,
    pub platform_service: PlatformService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("Database connection established");

        let mail = mail::create_mail_client(&config)?;
        Self::build(db_pool, config, mail)
    }

    /// Wires the dependency graph on top of an existing pool.
    pub fn build(db_pool: PgPool, config: Config, mail: DynMailClient) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let tenant_repo = TenantRepository::new(db_pool.clone());
        let user_repo = UserRepository::new(db_pool.clone());
        let account_repo = AccountRepository::new();
        let reset_repo = PasswordResetRepository::new(db_pool.clone());
        let todo_repo = TodoRepository::new(db_pool.clone());
        let invitation_repo = InvitationRepository::new(db_pool.clone());
        let admin_repo = AdminRepository::new(db_pool.clone());
        let admin_session_repo = AdminSessionRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let audit = AuditLogger::new(audit_repo.clone());

        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            user_repo.clone(),
            hasher.clone(),
            db_pool.clone(),
        );
        let auth_service = AuthService::new(
            tenant_repo.clone(),
            user_repo.clone(),
            account_repo,
            reset_repo.clone(),
            hasher.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let todo_service = TodoService::new(todo_repo);
        let invitation_service = InvitationService::new(
            invitation_repo,
            user_repo.clone(),
            hasher.clone(),
            db_pool.clone(),
        );
        let admin_auth_service = AdminAuthService::new(
            admin_repo,
            admin_session_repo,
            audit.clone(),
            hasher,
            db_pool.clone(),
        );
        let platform_service = PlatformService::new(
            tenant_repo,
            user_repo,
            reset_repo,
            audit_repo,
            audit,
            db_pool.clone(),
        );

        let oauth_providers = oauth_provider::build_providers(&config);
        let state_codec = StateCodec::new(config.oauth_state_secret.as_bytes())?;

        Ok(Self {
            db_pool,
            config,
            mail,
            oauth_providers,
            state_codec,
            tenant_service,
            auth_service,
            todo_service,
            invitation_service,
            admin_auth_service,
            platform_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/app"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ])
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_map(&base_vars()).unwrap();
        assert_eq!(config.root_domain, "localhost:3000");
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.oauth_state_secret, config.jwt_secret);
        assert!(config.smtp.is_none());
        assert!(config.google.is_none());
        assert!(config.is_localhost());
        assert_eq!(config.cookie_domain(), None);
        assert_eq!(
            config.tenant_path_url("acme", "/reset-password?token=t"),
            "http://localhost:3000/reset-password?token=t&tenant=acme"
        );
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_SECRET", "short");
        assert!(Config::from_map(&vars).is_err());
    }

    #[test]
    fn production_urls_use_subdomains() {
        let mut vars = base_vars();
        vars.insert("ROOT_DOMAIN", "app.example.com");
        vars.insert("PROTOCOL", "https");
        vars.insert("APP_ENV", "production");
        let config = Config::from_map(&vars).unwrap();
        assert!(config.is_production());
        assert!(!config.is_localhost());
        assert_eq!(config.tenant_url("acme"), "https://acme.app.example.com");
        assert_eq!(config.cookie_domain().as_deref(), Some(".app.example.com"));
        assert_eq!(
            config.tenant_path_url("acme", "/login"),
            "https://acme.app.example.com/login"
        );
    }

    #[test]
    fn only_own_hosts_count_as_tenant_urls() {
        let mut vars = base_vars();
        vars.insert("ROOT_DOMAIN", "app.example.com");
        vars.insert("PROTOCOL", "https");
        let config = Config::from_map(&vars).unwrap();

        assert!(config.is_tenant_url("https://acme.app.example.com/dashboard", "acme"));
        assert!(config.is_tenant_url("https://app.example.com/welcome", "acme"));
        assert!(!config.is_tenant_url("https://globex.app.example.com/", "acme"));
        assert!(!config.is_tenant_url("https://evil.attacker.net/phish", "acme"));
        assert!(!config.is_tenant_url("https://acme.app.example.com@evil.attacker.net/", "acme"));
        assert!(!config.is_tenant_url("https://app.example.com.evil.net/", "acme"));
        assert!(!config.is_tenant_url("http://acme.app.example.com/", "acme"));
        assert!(!config.is_tenant_url("javascript:alert(1)", "acme"));
        assert!(!config.is_tenant_url("/dashboard", "acme"));

        let local = Config::from_map(&base_vars()).unwrap();
        assert!(local.is_tenant_url("http://localhost:3000/dashboard?tenant=acme", "acme"));
        assert!(!local.is_tenant_url("http://localhost:4000/", "acme"));
    }

    #[test]
    fn smtp_requires_credentials() {
        let mut vars = base_vars();
        vars.insert("SMTP_HOST", "smtp.example.com");
        assert!(Config::from_map(&vars).is_err());
        vars.insert("SMTP_USER", "mailer");
        vars.insert("SMTP_PASS", "secret");
        let config = Config::from_map(&vars).unwrap();
        assert_eq!(config.smtp.unwrap().port, 587);
    }
}
