//! Hosted authorization flow against Nylas v3
//!
//! The user id travels through the consent round trip as the OAuth `state`
//! parameter and comes back unmodified on the callback.

use crate::config::NylasConfig;
use crate::domain::{non_blank, CodeExchange, GrantRecord};
use crate::error::{AppError, Result};
use crate::provider::{CodeExchangeRequest, MessagingProvider};
use crate::repository::GrantRepository;
use crate::service::GrantService;
use std::sync::Arc;
use url::Url;

/// Optional hints forwarded to the hosted consent screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeHints {
    /// Skip the provider picker (e.g. "google", "microsoft")
    pub provider: Option<String>,
    /// Pre-fill the account email
    pub login_hint: Option<String>,
}

pub struct AuthorizationFlow<R: GrantRepository, P: MessagingProvider> {
    provider: Arc<P>,
    grant_service: Arc<GrantService<R>>,
    config: NylasConfig,
    fallback_user_id: String,
}

impl<R: GrantRepository, P: MessagingProvider> AuthorizationFlow<R, P> {
    pub fn new(
        provider: Arc<P>,
        grant_service: Arc<GrantService<R>>,
        config: NylasConfig,
        fallback_user_id: String,
    ) -> Self {
        Self {
            provider,
            grant_service,
            config,
            fallback_user_id,
        }
    }

    /// Build the provider consent URL for `user_id`
    pub fn build_authorization_url(
        &self,
        user_id: &str,
        client_id: &str,
        redirect_uri: &str,
        hints: &AuthorizeHints,
    ) -> Result<Url> {
        if user_id.trim().is_empty() {
            return Err(AppError::BadRequest("userId must not be empty".to_string()));
        }

        let mut auth_url = Url::parse(&format!(
            "{}/v3/connect/auth",
            self.config.api_uri.trim_end_matches('/')
        ))
        .map_err(|e| AppError::Internal(e.into()))?;

        {
            let mut pairs = auth_url.query_pairs_mut();
            pairs.append_pair("client_id", client_id);
            pairs.append_pair("redirect_uri", redirect_uri);
            pairs.append_pair("response_type", "code");
            pairs.append_pair("access_type", "online");
            pairs.append_pair("state", user_id);
            if let Some(provider) = non_blank(hints.provider.as_deref()) {
                pairs.append_pair("provider", provider);
            }
            if let Some(login_hint) = non_blank(hints.login_hint.as_deref()) {
                pairs.append_pair("login_hint", login_hint);
            }
        }

        Ok(auth_url)
    }

    /// Consent URL using the configured client id and callback URI
    pub fn authorization_url_for(&self, user_id: &str, hints: &AuthorizeHints) -> Result<Url> {
        self.build_authorization_url(
            user_id,
            &self.config.client_id,
            &self.config.callback_uri,
            hints,
        )
    }

    /// Exchange a one-time authorization code for a grant. Never retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<CodeExchange> {
        let request = CodeExchangeRequest {
            code: code.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
        };

        let exchange = self.provider.exchange_code(&request).await.map_err(|e| {
            tracing::error!(
                provider = self.provider.provider_name(),
                "Authorization code exchange failed: {}",
                e
            );
            AppError::ExchangeFailed(e.to_string())
        })?;

        if exchange.grant_id.trim().is_empty() {
            return Err(AppError::ExchangeFailed(
                "provider returned an empty grant id".to_string(),
            ));
        }

        Ok(exchange)
    }

    /// Handle the consent redirect: exchange `code` and store the grant for `state`
    pub async fn complete_callback(
        &self,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Result<GrantRecord> {
        let code = non_blank(code)
            .ok_or_else(|| AppError::BadRequest("No authorization code provided".to_string()))?;
        let user_id = non_blank(state).unwrap_or(self.fallback_user_id.as_str());

        let exchange = self
            .exchange_code(
                code,
                &self.config.client_id,
                &self.config.client_secret,
                &self.config.callback_uri,
            )
            .await?;

        tracing::info!(
            user_id = %user_id,
            provider = exchange.provider.as_deref().unwrap_or("unknown"),
            "Authorization code exchanged"
        );

        self.grant_service
            .store_grant(
                user_id,
                &exchange.grant_id,
                exchange.email.as_deref(),
                exchange.provider.as_deref(),
            )
            .await
    }
}
