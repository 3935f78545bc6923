//! Grant gate extractor
//!
//! Gated handlers take a [`GrantContext`] argument. The extractor resolves the
//! acting user from the `userId` query parameter or the `x-user-id` header and
//! rejects with 401 plus an `authUrl` when that user has no grant.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::domain::GrantContext;
use crate::error::AppError;
use crate::service::UserIdHint;
use crate::state::HasGrants;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ID_PARAM: &str = "userId";

/// First `userId` value in a raw query string
pub fn user_id_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == USER_ID_PARAM)
        .map(|(_, value)| value.into_owned())
}

pub fn user_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Identity hint carried by the request line and headers
pub fn user_id_hint(parts: &Parts) -> UserIdHint {
    UserIdHint::new(
        user_id_from_query(parts.uri.query()),
        user_id_from_headers(&parts.headers),
    )
}

impl<S> FromRequestParts<S> for GrantContext
where
    S: HasGrants + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let hint = user_id_hint(parts);
        state.grant_gate().check(&hint).await?.into_context()
    }
}
