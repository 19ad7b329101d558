//! # Catalog Module
//!
//! Categories and the items filed under them:
//! - Repository queries over users, categories and items
//! - Ownership checks shared by every mutation
//! - JSON API and server-rendered pages

pub mod authorization;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod validators;
pub mod views;


pub use routes::catalog_routes;
