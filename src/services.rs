pub mod admin_auth;
pub mod audit;
pub mod auth;
pub mod authz;
pub mod invitation_service;
pub mod mail;
pub mod maintenance;
pub mod oauth_provider;
pub mod oauth_state;
pub mod password;
pub mod platform_service;
pub mod scope;
pub mod tenancy_service;
pub mod tenant_resolver;
pub mod todo_service;
