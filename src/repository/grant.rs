//! Grant repository (the grant store)

use crate::domain::{GrantRecord, RecordId, UpsertGrantInput};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Create the grant for `input.user_id`, or replace it in place if one exists
    async fn upsert_by_user_id(&self, input: &UpsertGrantInput) -> Result<GrantRecord>;
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<GrantRecord>>;
    /// Returns true iff a row was removed
    async fn delete_by_user_id(&self, user_id: &str) -> Result<bool>;
    async fn list_all(&self) -> Result<Vec<GrantRecord>>;
}

pub struct GrantRepositoryImpl {
    pool: MySqlPool,
}

impl GrantRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantRepository for GrantRepositoryImpl {
    async fn upsert_by_user_id(&self, input: &UpsertGrantInput) -> Result<GrantRecord> {
        let mut tx = self.pool.begin().await?;

        // The unique key on user_id serializes concurrent writers; last one wins.
        sqlx::query(
            r#"
            INSERT INTO grants (id, user_id, grant_id, email, provider, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NOW(3), NOW(3))
            ON DUPLICATE KEY UPDATE
                grant_id = VALUES(grant_id),
                email = COALESCE(VALUES(email), email),
                provider = COALESCE(VALUES(provider), provider),
                updated_at = NOW(3)
            "#,
        )
        .bind(RecordId::new_v4())
        .bind(&input.user_id)
        .bind(&input.grant_id)
        .bind(&input.email)
        .bind(&input.provider)
        .execute(&mut *tx)
        .await?;

        let grant = sqlx::query_as::<_, GrantRecord>(
            r#"
            SELECT id, user_id, grant_id, email, provider, created_at, updated_at
            FROM grants
            WHERE user_id = ?
            "#,
        )
        .bind(&input.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(grant)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<GrantRecord>> {
        let grant = sqlx::query_as::<_, GrantRecord>(
            r#"
            SELECT id, user_id, grant_id, email, provider, created_at, updated_at
            FROM grants
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }

    async fn delete_by_user_id(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM grants
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<GrantRecord>> {
        let grants = sqlx::query_as::<_, GrantRecord>(
            r#"
            SELECT id, user_id, grant_id, email, provider, created_at, updated_at
            FROM grants
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }
}
