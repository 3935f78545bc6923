//! Grant domain models for delegated provider authorization

use super::common::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored grant for one delegating user (one row per `user_id`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    pub id: RecordId,
    pub user_id: String,
    pub grant_id: String,
    pub email: Option<String>,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for GrantRecord {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new_v4(),
            user_id: String::new(),
            grant_id: String::new(),
            email: None,
            provider: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating or replacing the grant of a user
///
/// `email` and `provider` only overwrite stored values when present.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertGrantInput {
    pub user_id: String,
    pub grant_id: String,
    pub email: Option<String>,
    pub provider: Option<String>,
}

/// Grant resolved for the current request by the grant gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantContext {
    pub user_id: String,
    pub grant_id: String,
}

/// Outcome of a gate check
///
/// A missing grant is an expected state and is not modelled as an error here;
/// store faults are returned separately as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Granted(GrantContext),
    AuthRequired { user_id: String, auth_url: String },
}

impl GateDecision {
    /// Convert into a context, turning a missing grant into `AppError::AuthRequired`
    pub fn into_context(self) -> crate::error::Result<GrantContext> {
        match self {
            GateDecision::Granted(ctx) => Ok(ctx),
            GateDecision::AuthRequired { user_id, auth_url } => {
                Err(crate::error::AppError::AuthRequired { user_id, auth_url })
            }
        }
    }
}

/// Result of exchanging an authorization code with the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExchange {
    pub grant_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}
