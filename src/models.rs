// src/models.rs

pub mod account;
pub mod admin;
pub mod auth;
pub mod invitation;
pub mod tenancy;
pub mod todo;
