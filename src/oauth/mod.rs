//! # OAuth Module
//!
//! Third-party login:
//! - `provider`: the identity provider client (Google)
//! - `bridge`: code exchange, token checks and local user provisioning
//! - `handlers`/`routes`: login page, connect and disconnect endpoints

pub mod bridge;
pub mod handlers;
pub mod provider;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::oauth_routes;
