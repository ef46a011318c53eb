pub mod account_repo;
pub use account_repo::AccountRepository;
pub mod admin_repo;
pub use admin_repo::AdminRepository;
pub mod admin_session_repo;
pub use admin_session_repo::AdminSessionRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod invitation_repo;
pub use invitation_repo::InvitationRepository;
pub mod password_reset_repo;
pub use password_reset_repo::PasswordResetRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod todo_repo;
pub use todo_repo::TodoRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
