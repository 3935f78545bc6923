//! Nylas-facing HTTP handlers: consent, callback, dispatch and mailbox reads

use crate::domain::{non_blank, AttachmentInput, GrantContext, OutboundMessage, ProviderMessage, Recipient};
use crate::error::{AppError, Result};
use crate::middleware::{user_id_from_headers, user_id_from_query};
use crate::service::{AuthorizeHints, UserIdHint};
use crate::state::HasGrants;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthQuery {
    pub user_id: Option<String>,
    pub provider: Option<String>,
    pub login_hint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExchangeQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    pub message: String,
    pub grant_id: String,
}

/// `to` may be a bare address or a list of recipients
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecipientsInput {
    One(String),
    Many(Vec<Recipient>),
}

impl RecipientsInput {
    fn into_recipients(self) -> Vec<Recipient> {
        match self {
            RecipientsInput::One(email) if email.trim().is_empty() => Vec::new(),
            RecipientsInput::One(email) => vec![Recipient::new(email.trim())],
            RecipientsInput::Many(recipients) => recipients,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub to: Option<RecipientsInput>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentInput>>,
}

impl SendEmailRequest {
    fn into_message(self) -> OutboundMessage {
        OutboundMessage {
            to: self.to.map(RecipientsInput::into_recipients).unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            body: self.body.unwrap_or_default(),
            attachments: self.attachments,
        }
    }
}

/// Split a raw send body into the caller's `userId` and the parsed request
///
/// `userId` is read leniently so a malformed message can still be gated
/// for the right user.
fn parse_send_request(body: &[u8]) -> (Option<String>, Result<SendEmailRequest>) {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => {
            return (
                None,
                Err(AppError::BadRequest("Request body must be JSON".to_string())),
            )
        }
    };

    let user_id = value
        .get("userId")
        .and_then(Value::as_str)
        .map(str::to_string);
    let request = serde_json::from_value(value).map_err(|e| {
        AppError::InvalidMessage(format!("malformed message: {}", e))
    });

    (user_id, request)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub message: String,
    pub message_id: Option<String>,
    pub sent_message: ProviderMessage,
    pub attachments: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<ProviderMessage>,
    pub user_id: String,
}

/// Start consent: redirect the browser to the provider's hosted auth page
pub async fn auth<S: HasGrants>(
    State(state): State<S>,
    headers: HeaderMap,
    Query(query): Query<AuthQuery>,
) -> Result<Response> {
    let hint = UserIdHint::new(query.user_id, user_id_from_headers(&headers));
    let user_id = state.grant_gate().resolve_user_id(&hint);

    let hints = AuthorizeHints {
        provider: query.provider,
        login_hint: query.login_hint,
    };
    let auth_url = state
        .authorization_flow()
        .authorization_url_for(&user_id, &hints)?;

    tracing::info!(user_id = %user_id, "Redirecting to hosted authorization");

    Ok((StatusCode::FOUND, [(header::LOCATION, auth_url.to_string())]).into_response())
}

/// Consent callback: exchange the code and remember the grant for `state`
pub async fn exchange<S: HasGrants>(
    State(state): State<S>,
    Query(query): Query<ExchangeQuery>,
) -> Result<impl IntoResponse> {
    let grant = state
        .authorization_flow()
        .complete_callback(query.code.as_deref(), query.state.as_deref())
        .await?;

    Ok(Json(ExchangeResponse {
        message: format!(
            "OAuth2 flow completed successfully for grant ID: {}",
            grant.grant_id
        ),
        grant_id: grant.grant_id,
    }))
}

/// Send a message for the user named in the body, query, or `x-user-id` header
pub async fn send_email<S: HasGrants>(
    State(state): State<S>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let (body_user_id, request) = parse_send_request(&body);

    let explicit = non_blank(body_user_id.as_deref())
        .map(str::to_string)
        .or_else(|| user_id_from_query(uri.query()));
    let hint = UserIdHint::new(explicit, user_id_from_headers(&headers));
    let user_id = state.grant_gate().resolve_user_id(&hint);

    let request = match request {
        Ok(request) => request,
        Err(err) => {
            // An unauthorized caller hears about consent before input defects
            state.grant_gate().resolve(&user_id).await?.into_context()?;
            return Err(err);
        }
    };

    let result = state
        .dispatch_service()
        .send(&user_id, request.into_message())
        .await?;

    Ok(Json(SendEmailResponse {
        message: "Email sent successfully".to_string(),
        message_id: result.message_id,
        sent_message: result.provider_echoed_message,
        attachments: result.attachment_count,
    }))
}

/// Sent-folder listing for the authorized identity
pub async fn sent_emails<S: HasGrants>(
    State(state): State<S>,
    ctx: GrantContext,
) -> Result<impl IntoResponse> {
    let messages = state.mailbox_service().sent_messages(&ctx).await?;
    Ok(Json(MessagesResponse {
        messages,
        user_id: ctx.user_id,
    }))
}

/// Most recent messages for the authorized identity
pub async fn recent_emails<S: HasGrants>(
    State(state): State<S>,
    ctx: GrantContext,
) -> Result<impl IntoResponse> {
    let messages = state.mailbox_service().recent_messages(&ctx).await?;
    Ok(Json(MessagesResponse {
        messages,
        user_id: ctx.user_id,
    }))
}
