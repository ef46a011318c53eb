// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::services::tenant_resolver::is_reserved_subdomain;

pub const SLUG_MIN_LEN: usize = 3;
pub const SLUG_MAX_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tenant_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    Free,
    Pro,
    Enterprise,
}

// ---
// Tenant (the customer organization)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    // Never changes after signup; it is the subdomain.
    pub slug: String,
    pub plan: TenantPlan,
    pub is_suspended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Admin listing row.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantWithUserCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: TenantPlan,
    pub is_suspended: bool,
    pub user_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanDistribution {
    pub free: i64,
    pub pro: i64,
    pub enterprise: i64,
}

// ---
// Payloads
// ---

/// Self-service settings: only the owner may rename the organization.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantPayload {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters."))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateTenantPayload {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: Option<String>,
    pub plan: Option<TenantPlan>,
    pub is_suspended: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SlugQuery {
    pub slug: String,
}

/// Public card for the organization behind a subdomain.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
    pub name: String,
    pub slug: String,
    pub is_suspended: bool,
}

impl From<Tenant> for TenantInfo {
    fn from(tenant: Tenant) -> Self {
        Self {
            name: tenant.name,
            slug: tenant.slug,
            is_suspended: tenant.is_suspended,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlugAvailability {
    pub slug: String,
    pub available: bool,
}

/// Lowercase alphanumerics separated by single hyphens, 3–63 chars, not reserved.
pub fn validate_tenant_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.len() < SLUG_MIN_LEN || slug.len() > SLUG_MAX_LEN {
        let mut err = ValidationError::new("length");
        err.message = Some("Subdomain must be between 3 and 63 characters.".into());
        return Err(err);
    }

    let well_formed = slug
        .split('-')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    if !well_formed {
        let mut err = ValidationError::new("slug_format");
        err.message = Some("Subdomain must be lowercase alphanumeric with single hyphens.".into());
        return Err(err);
    }

    if is_reserved_subdomain(slug) {
        let mut err = ValidationError::new("slug_reserved");
        err.message = Some("This subdomain is reserved.".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_hyphenated_slugs() {
        assert!(validate_tenant_slug("acme").is_ok());
        assert!(validate_tenant_slug("acme-corp-2").is_ok());
    }

    #[test]
    fn rejects_malformed_slugs() {
        for slug in ["ab", "Acme", "-acme", "acme-", "ac--me", "ac.me", "ac_me"] {
            assert!(validate_tenant_slug(slug).is_err(), "{slug} should be rejected");
        }
        assert!(validate_tenant_slug(&"a".repeat(64)).is_err());
    }

    #[test]
    fn rejects_reserved_slugs() {
        let err = validate_tenant_slug("admin").unwrap_err();
        assert_eq!(err.code, "slug_reserved");
    }
}
