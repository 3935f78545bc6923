//! Grant administration API handlers

use crate::api::{MessageResponse, SuccessResponse};
use crate::error::{AppError, Result};
use crate::state::HasGrants;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

/// List stored grants, most recently updated first
pub async fn list<S: HasGrants>(State(state): State<S>) -> Result<impl IntoResponse> {
    let grants = state.grant_service().list_grants().await?;
    Ok(Json(SuccessResponse::new(grants)))
}

pub async fn get<S: HasGrants>(
    State(state): State<S>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let grant = state
        .grant_service()
        .get_grant(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No grant for user '{}'", user_id)))?;
    Ok(Json(SuccessResponse::new(grant)))
}

/// Revoke locally: the user has to go through consent again
pub async fn delete<S: HasGrants>(
    State(state): State<S>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    if !state.grant_service().delete_grant(&user_id).await? {
        return Err(AppError::NotFound(format!(
            "No grant for user '{}'",
            user_id
        )));
    }
    Ok(Json(MessageResponse::new("Grant deleted successfully")))
}
