//! Bearer-key guard for the grant administration API
//!
//! Requests must carry `Authorization: Bearer <ADMIN_API_KEY>`. Without a
//! configured key the admin routes answer 403 for every caller.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::HasGrants;

pub async fn require_admin<S: HasGrants>(
    State(state): State<S>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config().admin.api_key.as_deref() else {
        return AppError::Forbidden("Admin API is disabled".to_string()).into_response();
    };

    let token = match request.headers().get(AUTHORIZATION) {
        Some(header) => header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string),
        None => {
            return AppError::Unauthorized("Missing authorization token".to_string())
                .into_response();
        }
    };

    match token {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request with wrong key");
            AppError::Unauthorized("Invalid admin key".to_string()).into_response()
        }
        None => AppError::Unauthorized(
            "Authorization header must use Bearer scheme".to_string(),
        )
        .into_response(),
    }
}
