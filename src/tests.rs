// src/tests.rs
//
// Tests that need a database are `#[ignore]`d; run them with
// `DATABASE_URL=... cargo test -- --ignored`.

mod support;

mod admin_panel;
mod isolation;
mod oauth_redirects;
mod sessions;
mod tenant_routing;
