//! Outbound message models and provider payload shapes

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Mail recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Recipient {
    #[validate(email)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

/// Attachment as received from API callers (base64 content, camelCase fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Declared byte length; checked against the decoded content
    #[serde(default)]
    pub size: Option<u64>,
}

/// Message to send on behalf of a user (never persisted)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    pub attachments: Option<Vec<AttachmentInput>>,
}

impl OutboundMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn to(mut self, recipient: Recipient) -> Self {
        self.to.push(recipient);
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentInput) -> Self {
        self.attachments.get_or_insert_with(Vec::new).push(attachment);
        self
    }
}

/// Attachment in the shape the provider expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttachment {
    pub filename: String,
    /// Standard base64 of the decoded bytes
    pub content: String,
    pub content_type: String,
    pub size: u64,
}

/// Body of a provider send call
///
/// `attachments` is left out of the JSON entirely when there are none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub to: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ProviderAttachment>>,
}

impl SendMessagePayload {
    pub fn attachment_count(&self) -> usize {
        self.attachments.as_ref().map_or(0, Vec::len)
    }
}

/// Message object as returned by the provider, kept opaque
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderMessage(pub serde_json::Value);

impl ProviderMessage {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(|v| v.as_str())
    }
}

/// Query for listing messages of a grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesQuery {
    pub limit: u32,
    /// Folder filter (`in` parameter), e.g. "SENT"
    pub folder: Option<String>,
}

/// Outcome of a successful dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct SendResult {
    pub message_id: Option<String>,
    pub provider_echoed_message: ProviderMessage,
    pub attachment_count: usize,
}
