// src/services/oauth_provider.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    config::{Config, GoogleOAuthConfig},
    models::account::{OAuthProfile, OAuthTokens},
};

/// Authorization-code flow against an external identity provider.
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    fn id(&self) -> &'static str;
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String;
    async fn exchange(&self, code: &str, redirect_uri: &str) -> anyhow::Result<OAuthProfile>;
}

pub type DynOAuthProvider = Arc<dyn OAuthProvider>;

#[derive(Clone, Default)]
pub struct OAuthProviders {
    providers: Arc<HashMap<&'static str, DynOAuthProvider>>,
}

impl OAuthProviders {
    pub fn new(list: Vec<DynOAuthProvider>) -> Self {
        let providers = list.into_iter().map(|p| (p.id(), p)).collect();
        Self {
            providers: Arc::new(providers),
        }
    }

    pub fn get(&self, id: &str) -> Option<DynOAuthProvider> {
        self.providers.get(id).cloned()
    }
}

pub fn build_providers(config: &Config) -> OAuthProviders {
    let mut list: Vec<DynOAuthProvider> = Vec::new();
    if let Some(google) = &config.google {
        list.push(Arc::new(GoogleProvider::new(google)));
    }
    OAuthProviders::new(list)
}

// Callbacks always land on the root domain; the tenant travels in `state`.
pub fn redirect_uri(config: &Config, provider: &str) -> String {
    format!("{}/api/auth/oauth/{}/callback", config.base_url(), provider)
}

// ---
// Google
// ---

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: &GoogleOAuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http,
        }
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GoogleProvider {
    fn id(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&prompt=select_account",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        )
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> anyhow::Result<OAuthProfile> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let token: GoogleTokenResponse = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .context("Google token request failed")?
            .error_for_status()
            .context("Google rejected the authorization code")?
            .json()
            .await
            .context("Google token response was not valid JSON")?;

        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("Google userinfo request failed")?
            .error_for_status()
            .context("Google rejected the access token")?
            .json()
            .await
            .context("Google userinfo response was not valid JSON")?;

        if info.email.is_some() && info.email_verified == Some(false) {
            return Err(anyhow!("Google account email is not verified"));
        }

        Ok(OAuthProfile {
            provider_account_id: info.sub,
            email: info.email,
            name: info.name,
            tokens: OAuthTokens {
                access_token: Some(token.access_token),
                refresh_token: token.refresh_token,
                expires_at: token.expires_in.map(|secs| Utc::now().timestamp() + secs),
                token_type: token.token_type,
                scope: token.scope,
                id_token: token.id_token,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_authorize_url_encodes_state_and_redirect() {
        let provider = GoogleProvider::new(&GoogleOAuthConfig {
            client_id: "client-123".into(),
            client_secret: "secret".into(),
        });
        let url = provider.authorize_url("abc.def", "http://localhost:3000/api/auth/oauth/google/callback");
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("state=abc.def"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Foauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
    }

    #[test]
    fn registry_looks_up_by_id() {
        let provider: DynOAuthProvider = Arc::new(GoogleProvider::new(&GoogleOAuthConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
        }));
        let providers = OAuthProviders::new(vec![provider]);
        assert!(providers.get("google").is_some());
        assert!(providers.get("github").is_none());
    }
}
