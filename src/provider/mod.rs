//! Mail provider capability
//!
//! The provider is reached only through [`MessagingProvider`]; the production
//! implementation talks to the Nylas v3 REST API.

pub mod nylas;

pub use nylas::NylasClient;

use crate::domain::{CodeExchange, ListMessagesQuery, ProviderMessage, SendMessagePayload};
use async_trait::async_trait;
use thiserror::Error;

/// Provider error types
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Parameters for a one-time authorization code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExchangeRequest {
    pub code: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Trait for the delegated mail provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Exchange an authorization code for a grant
    async fn exchange_code(
        &self,
        request: &CodeExchangeRequest,
    ) -> Result<CodeExchange, ProviderError>;

    /// Send a message as the owner of `grant_id`
    async fn send_message(
        &self,
        grant_id: &str,
        payload: &SendMessagePayload,
    ) -> Result<ProviderMessage, ProviderError>;

    /// List messages visible to `grant_id`
    async fn list_messages(
        &self,
        grant_id: &str,
        query: &ListMessagesQuery,
    ) -> Result<Vec<ProviderMessage>, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
