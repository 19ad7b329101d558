//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Password hashing and verification
//! - Bearer token issuing and validation
//! - Browser sessions and flash messages
//! - Credential resolution and the `Principal` extractor for protected routes

pub mod credentials;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod tokens;


pub use extractors::Principal;
pub use routes::auth_routes;
