// src/handlers.rs

pub mod admin;
pub mod admin_auth;
pub mod auth;
pub mod invitations;
pub mod oauth;
pub mod todos;
pub mod users;
