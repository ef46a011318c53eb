// src/services/scope.rs

use uuid::Uuid;

use crate::common::error::AppError;

/// The validated (tenant, user) pair every tenant-owned read and write runs under.
/// Built from a verified session only, never from request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

impl Context {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Result<Self, AppError> {
        let ctx = Self { tenant_id, user_id };
        validate_context(&ctx)?;
        Ok(ctx)
    }
}

pub fn validate_context(ctx: &Context) -> Result<(), AppError> {
    if ctx.tenant_id.is_nil() || ctx.user_id.is_nil() {
        return Err(AppError::Unauthorized("A valid tenant session is required.".into()));
    }
    Ok(())
}
