//! Grant lifecycle business logic

use crate::domain::{non_blank, GrantRecord, UpsertGrantInput};
use crate::error::{AppError, Result};
use crate::repository::GrantRepository;
use std::sync::Arc;

pub struct GrantService<R: GrantRepository> {
    grant_repo: Arc<R>,
}

impl<R: GrantRepository> GrantService<R> {
    pub fn new(grant_repo: Arc<R>) -> Self {
        Self { grant_repo }
    }

    /// Store the grant for a user, replacing the previous grant id if one exists
    ///
    /// Replaying the same exchange leaves the stored state unchanged.
    pub async fn store_grant(
        &self,
        user_id: &str,
        grant_id: &str,
        email: Option<&str>,
        provider: Option<&str>,
    ) -> Result<GrantRecord> {
        let user_id = non_blank(Some(user_id))
            .ok_or_else(|| AppError::BadRequest("userId must not be empty".to_string()))?;
        let grant_id = non_blank(Some(grant_id))
            .ok_or_else(|| AppError::BadRequest("grantId must not be empty".to_string()))?;

        let input = UpsertGrantInput {
            user_id: user_id.to_string(),
            grant_id: grant_id.to_string(),
            email: non_blank(email).map(str::to_string),
            provider: non_blank(provider).map(str::to_string),
        };

        let grant = self
            .grant_repo
            .upsert_by_user_id(&input)
            .await
            .map_err(|e| store_fault("store", e))?;

        tracing::info!(user_id = %grant.user_id, "Stored grant");
        Ok(grant)
    }

    pub async fn get_grant(&self, user_id: &str) -> Result<Option<GrantRecord>> {
        self.grant_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|e| store_fault("get", e))
    }

    /// Grant id for a user; `None` when the user never authorized
    pub async fn get_grant_id(&self, user_id: &str) -> Result<Option<String>> {
        let grant = self
            .grant_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|e| store_fault("get_grant_id", e))?;

        Ok(grant.map(|g| g.grant_id))
    }

    pub async fn delete_grant(&self, user_id: &str) -> Result<bool> {
        let deleted = self
            .grant_repo
            .delete_by_user_id(user_id)
            .await
            .map_err(|e| store_fault("delete", e))?;

        if deleted {
            tracing::info!(user_id = %user_id, "Deleted grant");
        }
        Ok(deleted)
    }

    pub async fn list_grants(&self) -> Result<Vec<GrantRecord>> {
        self.grant_repo
            .list_all()
            .await
            .map_err(|e| store_fault("list", e))
    }
}

fn store_fault(operation: &'static str, err: AppError) -> AppError {
    tracing::error!("Grant store failure during {}: {}", operation, err);
    AppError::grant_operation(operation, err)
}
