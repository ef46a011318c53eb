// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    services::{
        auth::Session,
        authz::{ensure, Capability},
    },
};

/// Type-level name for one entry of the capability table.
pub trait CapabilityDef: Send + Sync + 'static {
    fn capability() -> Capability;
}

/// Rejects with 403 unless the session role holds `T`'s capability.
/// Must run behind `auth_guard`.
pub struct RequireCapability<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireCapability<T>
where
    T: CapabilityDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(AppError::InvalidToken)?;
        ensure(session.role(), T::capability())?;
        Ok(RequireCapability(PhantomData))
    }
}

// ---
// Capabilities checked at the route level
// ---

pub struct CanManageTodos;
impl CapabilityDef for CanManageTodos {
    fn capability() -> Capability { Capability::ManageTodos }
}

pub struct CanViewTeam;
impl CapabilityDef for CanViewTeam {
    fn capability() -> Capability { Capability::ViewTeam }
}

pub struct CanManageTenantSettings;
impl CapabilityDef for CanManageTenantSettings {
    fn capability() -> Capability { Capability::ManageTenantSettings }
}
