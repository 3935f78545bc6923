//! Grant gate: decides whether a request may reach the provider

use crate::domain::{non_blank, GateDecision, GrantContext};
use crate::error::Result;
use crate::repository::GrantRepository;
use crate::service::GrantService;
use std::sync::Arc;

/// Where a request said who it acts for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdHint {
    /// Query parameter or body field `userId`
    pub explicit: Option<String>,
    /// `x-user-id` header
    pub header: Option<String>,
}

impl UserIdHint {
    pub fn new(explicit: Option<String>, header: Option<String>) -> Self {
        Self { explicit, header }
    }
}

pub struct GrantGate<R: GrantRepository> {
    grant_service: Arc<GrantService<R>>,
    fallback_user_id: String,
    link_base: String,
}

impl<R: GrantRepository> GrantGate<R> {
    /// `link_base` prefixes re-auth links; empty yields a relative path
    pub fn new(
        grant_service: Arc<GrantService<R>>,
        fallback_user_id: String,
        link_base: impl Into<String>,
    ) -> Self {
        Self {
            grant_service,
            fallback_user_id,
            link_base: link_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Explicit parameter, then header, then the configured fallback
    pub fn resolve_user_id(&self, hint: &UserIdHint) -> String {
        non_blank(hint.explicit.as_deref())
            .or_else(|| non_blank(hint.header.as_deref()))
            .unwrap_or(self.fallback_user_id.as_str())
            .to_string()
    }

    /// Local route that starts consent for `user_id`
    pub fn auth_url(&self, user_id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
        format!("{}/nylas/auth?userId={}", self.link_base, encoded)
    }

    /// Look up the grant for `user_id`
    ///
    /// A missing grant is `Ok(AuthRequired)`; only store faults are `Err`.
    pub async fn resolve(&self, user_id: &str) -> Result<GateDecision> {
        match self.grant_service.get_grant_id(user_id).await? {
            Some(grant_id) => Ok(GateDecision::Granted(GrantContext {
                user_id: user_id.to_string(),
                grant_id,
            })),
            None => {
                tracing::debug!(user_id = %user_id, "No grant stored, authorization required");
                Ok(GateDecision::AuthRequired {
                    user_id: user_id.to_string(),
                    auth_url: self.auth_url(user_id),
                })
            }
        }
    }

    /// Resolve the identity from `hint` and run the gate for it
    pub async fn check(&self, hint: &UserIdHint) -> Result<GateDecision> {
        let user_id = self.resolve_user_id(hint);
        self.resolve(&user_id).await
    }
}
