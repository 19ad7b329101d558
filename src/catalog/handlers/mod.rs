//! Catalog request handlers
//!
//! `api` serves the JSON API; `pages` serves the session-backed HTML pages.

pub mod api;
pub mod page;
pub mod pages;
