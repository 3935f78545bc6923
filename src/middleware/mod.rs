//! HTTP middleware for Mailgrant Core
//!
//! - `GrantContext` extractor enforcing the grant gate on provider-facing routes
//! - Bearer-key guard for the grant administration API
//! - JSON normalization of framework error responses
//! - Request span maker that keeps OAuth secrets out of logs

pub mod admin;
pub mod error_response;
pub mod grant_gate;
pub mod trace;

pub use admin::require_admin;
pub use error_response::normalize_error_response;
pub use grant_gate::{user_id_from_headers, user_id_from_query, user_id_hint};
pub use trace::SanitizedMakeSpan;
