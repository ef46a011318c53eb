// src/services/oauth_state.rs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// States older than this are rejected.
pub const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;

/// Carried through the provider redirect so the callback knows which tenant started the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub tenant_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("OAuth state is missing")]
    Missing,
    #[error("OAuth state is empty")]
    Empty,
    #[error("OAuth state is not valid base64")]
    MalformedBase64,
    #[error("OAuth state signature does not match")]
    BadSignature,
    #[error("OAuth state is not valid JSON")]
    MalformedJson,
    #[error("OAuth state is invalid: {0}")]
    InvalidSchema(&'static str),
    #[error("OAuth state has expired")]
    Expired,
}

/// `<payload>.<mac>`, both base64url without padding; the MAC is HMAC-SHA256 over the payload bytes.
#[derive(Clone)]
pub struct StateCodec {
    mac: HmacSha256,
}

impl StateCodec {
    pub fn new(secret: &[u8]) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("invalid OAuth state secret: {e}"))?;
        Ok(Self { mac })
    }

    pub fn encode(&self, tenant_slug: &str, callback_url: Option<&str>) -> String {
        self.encode_at(tenant_slug, callback_url, Utc::now().timestamp_millis())
    }

    pub fn encode_at(&self, tenant_slug: &str, callback_url: Option<&str>, timestamp_ms: i64) -> String {
        let state = OAuthState {
            tenant_slug: tenant_slug.to_string(),
            callback_url: callback_url.map(str::to_string),
            timestamp: timestamp_ms,
        };
        // Serializing a struct of strings and an integer cannot fail.
        let payload = serde_json::to_vec(&state).unwrap_or_default();
        let signature = self.sign(&payload);

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    pub fn decode(&self, raw: Option<&str>) -> Result<OAuthState, StateError> {
        self.decode_at(raw, Utc::now().timestamp_millis())
    }

    pub fn decode_at(&self, raw: Option<&str>, now_ms: i64) -> Result<OAuthState, StateError> {
        let raw = raw.ok_or(StateError::Missing)?.trim();
        if raw.is_empty() {
            return Err(StateError::Empty);
        }

        let (payload_b64, mac_b64) = raw.split_once('.').ok_or(StateError::MalformedBase64)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| StateError::MalformedBase64)?;
        let signature = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| StateError::MalformedBase64)?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| StateError::BadSignature)?;

        let value: Value = serde_json::from_slice(&payload).map_err(|_| StateError::MalformedJson)?;
        let state = check_schema(&value)?;

        if now_ms - state.timestamp > STATE_MAX_AGE_MS {
            return Err(StateError::Expired);
        }

        Ok(state)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn check_schema(value: &Value) -> Result<OAuthState, StateError> {
    let object = value
        .as_object()
        .ok_or(StateError::InvalidSchema("payload must be an object"))?;

    let tenant_slug = object
        .get("tenantSlug")
        .and_then(Value::as_str)
        .filter(|slug| !slug.is_empty())
        .ok_or(StateError::InvalidSchema("tenantSlug must be a non-empty string"))?;

    let callback_url = match object.get("callbackUrl") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            let parsed = url::Url::parse(raw)
                .map_err(|_| StateError::InvalidSchema("callbackUrl must be an absolute URL"))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(StateError::InvalidSchema("callbackUrl must use http or https"));
            }
            Some(raw.clone())
        }
        Some(_) => return Err(StateError::InvalidSchema("callbackUrl must be a string")),
    };

    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_i64)
        .filter(|ts| *ts > 0)
        .ok_or(StateError::InvalidSchema("timestamp must be a positive integer"))?;

    Ok(OAuthState {
        tenant_slug: tenant_slug.to_string(),
        callback_url,
        timestamp,
    })
}
