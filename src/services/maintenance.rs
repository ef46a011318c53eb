// src/services/maintenance.rs

use std::time::Duration;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::{AdminSessionRepository, InvitationRepository, PasswordResetRepository},
    services::admin_auth::INACTIVITY_MINUTES,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub admin_sessions_deleted: u64,
    pub invitations_expired: u64,
    pub reset_tokens_deleted: u64,
}

/// Housekeeping for rows that expiry checks already ignore.
#[derive(Clone)]
pub struct Maintenance {
    session_repo: AdminSessionRepository,
    invitation_repo: InvitationRepository,
    reset_repo: PasswordResetRepository,
}

impl Maintenance {
    pub fn new(
        session_repo: AdminSessionRepository,
        invitation_repo: InvitationRepository,
        reset_repo: PasswordResetRepository,
    ) -> Self {
        Self {
            session_repo,
            invitation_repo,
            reset_repo,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, AppError> {
        let now = Utc::now();
        let idle_cutoff = now - chrono::Duration::minutes(INACTIVITY_MINUTES);

        let report = SweepReport {
            admin_sessions_deleted: self.session_repo.delete_expired(now, idle_cutoff).await?,
            invitations_expired: self.invitation_repo.expire_all_stale().await?,
            reset_tokens_deleted: self.reset_repo.delete_stale().await?,
        };

        tracing::info!(
            sessions = report.admin_sessions_deleted,
            invitations = report.invitations_expired,
            reset_tokens = report.reset_tokens_deleted,
            "Maintenance sweep finished"
        );
        Ok(report)
    }

    /// Sweeps once now, then every `interval`. A zero interval only runs the first sweep.
    pub fn spawn(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.sweep().await {
                tracing::error!("Maintenance sweep failed: {:?}", e);
            }
            if interval.is_zero() {
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!("Maintenance sweep failed: {:?}", e);
                }
            }
        })
    }
}
