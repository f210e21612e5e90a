//! # TaskHub API Server Library
//!
//! HTTP surface of the TaskHub task tracker.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and actor resolution layer
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
