//! Mailgrant Core - delegated mail grant service
//!
//! This crate manages per-user OAuth2 grants against the Nylas API and
//! gates outbound mail dispatch on those grants. It exposes a REST API,
//! a MySQL-backed grant store and a reqwest-based provider client.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod provider;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
