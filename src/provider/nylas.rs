//! Nylas v3 API client
//!
//! Covers the three calls the grant flow needs: the hosted-auth token
//! exchange, grant-scoped message send, and grant-scoped message listing.

use super::{CodeExchangeRequest, MessagingProvider, ProviderError};
use crate::config::NylasConfig;
use crate::domain::{CodeExchange, ListMessagesQuery, ProviderMessage, SendMessagePayload};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Nylas API client
#[derive(Clone)]
pub struct NylasClient {
    config: NylasConfig,
    http_client: Client,
}

/// Every Nylas response wraps its payload in `data`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    grant_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

impl NylasClient {
    /// Create a new Nylas client
    pub fn new(config: NylasConfig) -> Result<Self, ProviderError> {
        Url::parse(&config.api_uri).map_err(|e| {
            ProviderError::InvalidConfiguration(format!("Invalid NYLAS_API_URI: {}", e))
        })?;

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Get the API base URL
    pub fn api_uri(&self) -> &str {
        &self.config.api_uri
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.api_uri)
            .map_err(|e| ProviderError::InvalidConfiguration(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::InvalidConfiguration("NYLAS_API_URI cannot be a base".to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_data<T: DeserializeOwned>(
        response: Response,
        action: &str,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: format!("Failed to {}: {}", action, body),
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse {} response: {}", action, e))
        })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl MessagingProvider for NylasClient {
    async fn exchange_code(
        &self,
        request: &CodeExchangeRequest,
    ) -> Result<CodeExchange, ProviderError> {
        let url = self.endpoint(&["v3", "connect", "token"])?;

        let body = TokenRequest {
            client_id: &request.client_id,
            client_secret: &request.client_secret,
            code: &request.code,
            redirect_uri: &request.redirect_uri,
            grant_type: "authorization_code",
        };

        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to exchange code: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: format!("Failed to exchange code: {}", body),
            });
        }

        // The token endpoint answers without the usual `data` envelope
        let token: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        Ok(CodeExchange {
            grant_id: token.grant_id,
            email: token.email,
            provider: token.provider,
        })
    }

    async fn send_message(
        &self,
        grant_id: &str,
        payload: &SendMessagePayload,
    ) -> Result<ProviderMessage, ProviderError> {
        let url = self.endpoint(&["v3", "grants", grant_id, "messages", "send"])?;

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to send message: {}", e)))?;

        Self::read_data(response, "send message").await
    }

    async fn list_messages(
        &self,
        grant_id: &str,
        query: &ListMessagesQuery,
    ) -> Result<Vec<ProviderMessage>, ProviderError> {
        let mut url = self.endpoint(&["v3", "grants", grant_id, "messages"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(ref folder) = query.folder {
                pairs.append_pair("in", folder);
            }
        }

        tracing::debug!("Listing messages for grant {} (folder: {:?})", grant_id, query.folder);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to list messages: {}", e)))?;

        Self::read_data(response, "list messages").await
    }

    fn provider_name(&self) -> &'static str {
        "nylas"
    }
}
