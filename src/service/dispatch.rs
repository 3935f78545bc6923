//! Gated outbound mail dispatch

use crate::config::DispatchConfig;
use crate::domain::{
    non_blank, AttachmentInput, OutboundMessage, ProviderAttachment, Recipient,
    SendMessagePayload, SendResult,
};
use crate::error::{AppError, Result};
use crate::provider::MessagingProvider;
use crate::repository::GrantRepository;
use crate::service::GrantGate;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct DispatchService<R: GrantRepository, P: MessagingProvider> {
    gate: Arc<GrantGate<R>>,
    provider: Arc<P>,
    config: DispatchConfig,
}

impl<R: GrantRepository, P: MessagingProvider> DispatchService<R, P> {
    pub fn new(gate: Arc<GrantGate<R>>, provider: Arc<P>, config: DispatchConfig) -> Self {
        Self {
            gate,
            provider,
            config,
        }
    }

    /// Send `message` as `user_id`
    ///
    /// The grant is resolved first; a user without a grant gets
    /// `AuthRequired` and the provider is never contacted. Failed sends are
    /// reported once and not retried.
    pub async fn send(&self, user_id: &str, message: OutboundMessage) -> Result<SendResult> {
        let ctx = self.gate.resolve(user_id).await?.into_context()?;
        let payload = self.prepare(message)?;
        let attachment_count = payload.attachment_count();

        tracing::info!(
            user_id = %ctx.user_id,
            recipients = payload.to.len(),
            attachments = attachment_count,
            "Dispatching message"
        );

        let sent = self
            .provider
            .send_message(&ctx.grant_id, &payload)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %ctx.user_id, "Failed to send message: {}", e);
                AppError::DispatchFailed(e.to_string())
            })?;

        Ok(SendResult {
            message_id: sent.id().map(str::to_string),
            provider_echoed_message: sent,
            attachment_count,
        })
    }

    /// Validate a message and convert it to the provider payload
    pub fn prepare(&self, message: OutboundMessage) -> Result<SendMessagePayload> {
        if message.subject.trim().is_empty() {
            return Err(AppError::InvalidMessage("subject is required".to_string()));
        }
        if message.body.trim().is_empty() {
            return Err(AppError::InvalidMessage("body is required".to_string()));
        }

        let to = self.recipients(message.to)?;

        let attachments = message
            .attachments
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, attachment)| convert_attachment(index, attachment))
            .collect::<Result<Vec<_>>>()?;

        let total: u64 = attachments.iter().map(|a| a.size).sum();
        if total > self.config.max_attachment_bytes as u64 {
            return Err(AppError::InvalidMessage(format!(
                "attachments total {} bytes, limit is {}",
                total, self.config.max_attachment_bytes
            )));
        }

        Ok(SendMessagePayload {
            to,
            subject: message.subject,
            body: message.body,
            attachments: if attachments.is_empty() {
                None
            } else {
                Some(attachments)
            },
        })
    }

    fn recipients(&self, to: Vec<Recipient>) -> Result<Vec<Recipient>> {
        let to = if to.is_empty() {
            match non_blank(self.config.default_recipient.as_deref()) {
                Some(default) => vec![Recipient::new(default)],
                None => {
                    return Err(AppError::InvalidMessage(
                        "at least one recipient is required".to_string(),
                    ))
                }
            }
        } else {
            to
        };

        for recipient in &to {
            recipient.validate().map_err(|_| {
                AppError::InvalidMessage(format!(
                    "invalid recipient address '{}'",
                    recipient.email
                ))
            })?;
        }

        Ok(to)
    }
}

fn convert_attachment(index: usize, attachment: AttachmentInput) -> Result<ProviderAttachment> {
    let filename = non_blank(Some(attachment.filename.as_str()))
        .ok_or_else(|| {
            AppError::InvalidMessage(format!("attachment {} has no filename", index))
        })?
        .to_string();

    let content: String = attachment
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if content.is_empty() {
        return Err(AppError::InvalidMessage(format!(
            "attachment '{}' has no content",
            filename
        )));
    }

    let bytes = STANDARD.decode(content.as_bytes()).map_err(|_| {
        AppError::InvalidMessage(format!(
            "attachment '{}' content is not valid base64",
            filename
        ))
    })?;
    let size = bytes.len() as u64;

    if let Some(declared) = attachment.size {
        if declared != size {
            return Err(AppError::InvalidMessage(format!(
                "attachment '{}' declares {} bytes but contains {}",
                filename, declared, size
            )));
        }
    }

    Ok(ProviderAttachment {
        filename,
        content: STANDARD.encode(&bytes),
        content_type: non_blank(attachment.content_type.as_deref())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
        size,
    })
}
