//! Read-side mailbox access for authorized users

use crate::config::NylasConfig;
use crate::domain::{GrantContext, ListMessagesQuery, ProviderMessage};
use crate::error::{AppError, Result};
use crate::provider::MessagingProvider;
use std::sync::Arc;

pub struct MailboxService<P: MessagingProvider> {
    provider: Arc<P>,
    message_limit: u32,
    sent_folder: String,
}

impl<P: MessagingProvider> MailboxService<P> {
    pub fn new(provider: Arc<P>, config: &NylasConfig) -> Self {
        Self {
            provider,
            message_limit: config.message_limit,
            sent_folder: config.sent_folder.clone(),
        }
    }

    /// Newest messages visible to the grant
    pub async fn recent_messages(&self, ctx: &GrantContext) -> Result<Vec<ProviderMessage>> {
        self.list(
            ctx,
            ListMessagesQuery {
                limit: self.message_limit,
                folder: None,
            },
        )
        .await
    }

    /// Messages in the sent folder of the authorized identity
    pub async fn sent_messages(&self, ctx: &GrantContext) -> Result<Vec<ProviderMessage>> {
        self.list(
            ctx,
            ListMessagesQuery {
                limit: self.message_limit,
                folder: Some(self.sent_folder.clone()),
            },
        )
        .await
    }

    async fn list(
        &self,
        ctx: &GrantContext,
        query: ListMessagesQuery,
    ) -> Result<Vec<ProviderMessage>> {
        self.provider
            .list_messages(&ctx.grant_id, &query)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %ctx.user_id, "Failed to list messages: {}", e);
                AppError::Provider(e.to_string())
            })
    }
}
