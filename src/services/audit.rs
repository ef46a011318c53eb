// src/services/audit.rs

use serde_json::Value;

use crate::{
    db::AuditRepository,
    models::admin::{AuditAction, AuditActor, AuditTarget},
};

/// Appends to the audit log. Never fails the surrounding action.
#[derive(Clone)]
pub struct AuditLogger {
    audit_repo: AuditRepository,
}

impl AuditLogger {
    pub fn new(audit_repo: AuditRepository) -> Self {
        Self { audit_repo }
    }

    pub async fn record(
        &self,
        actor: &AuditActor,
        action: AuditAction,
        target: Option<(AuditTarget, String)>,
        details: Option<Value>,
    ) {
        if let Err(e) = self.audit_repo.insert(actor, action, target, details).await {
            tracing::error!(
                action = action.as_str(),
                admin_id = %actor.admin_id,
                "Failed to write audit log entry: {:?}",
                e
            );
        }
    }
}
