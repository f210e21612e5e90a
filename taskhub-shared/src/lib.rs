//! # TaskHub Shared Library
//!
//! Domain types, the authorization engine, the view projection layer and the
//! entity store used by the TaskHub API server.
//!
//! ## Module Organization
//!
//! - `auth`: Authorization rules, password hashing, tokens, actor resolution
//! - `models`: Entity types and their PostgreSQL queries
//! - `store`: The entity store interface and its implementations
//! - `views`: Read projections and write payload validation
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;
pub mod views;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
