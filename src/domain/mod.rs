//! Domain models for Mailgrant Core

pub mod common;
pub mod grant;
pub mod message;

pub use common::*;
pub use grant::*;
pub use message::*;
