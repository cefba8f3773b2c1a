//! Secret storage for the Agent Secrets Manager connector (§3, §4.8).

use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::Secret;

pub struct SecretRepository;

impl SecretRepository {
    pub async fn find<'e, E>(
        executor: E,
        linked_account_id: Uuid,
        key_name: &str,
    ) -> Result<Option<Secret>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Secret>(
            "SELECT * FROM secrets WHERE linked_account_id = $1 AND key_name = $2",
        )
        .bind(linked_account_id)
        .bind(key_name)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn list<'e, E>(executor: E, linked_account_id: Uuid) -> Result<Vec<Secret>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Secret>(
            "SELECT * FROM secrets WHERE linked_account_id = $1 ORDER BY key_name",
        )
        .bind(linked_account_id)
        .fetch_all(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn upsert<'e, E>(
        executor: E,
        linked_account_id: Uuid,
        key_name: &str,
        encrypted_value: &[u8],
    ) -> Result<Secret>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Secret>(
            r#"
            INSERT INTO secrets (id, linked_account_id, key_name, encrypted_value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (linked_account_id, key_name)
            DO UPDATE SET encrypted_value = EXCLUDED.encrypted_value, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(linked_account_id)
        .bind(key_name)
        .bind(encrypted_value)
        .fetch_one(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn delete<'e, E>(executor: E, linked_account_id: Uuid, key_name: &str) -> Result<bool>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM secrets WHERE linked_account_id = $1 AND key_name = $2")
            .bind(linked_account_id)
            .bind(key_name)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
