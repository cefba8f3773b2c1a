//! Linked Account storage (§4.3).

use chrono::Utc;
use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::LinkedAccount;
use crate::models::enums::SecurityScheme;

pub struct LinkedAccountRepository;

impl LinkedAccountRepository {
    pub async fn find_by_project_app_owner<'e, E>(
        executor: E,
        project_id: Uuid,
        app_id: Uuid,
        owner_id: &str,
    ) -> Result<Option<LinkedAccount>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LinkedAccount>(
            "SELECT * FROM linked_accounts WHERE project_id = $1 AND app_id = $2 AND linked_account_owner_id = $3",
        )
        .bind(project_id)
        .bind(app_id)
        .bind(owner_id)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<LinkedAccount>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LinkedAccount>("SELECT * FROM linked_accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(Error::from)
    }

    /// Fails with a unique-violation surfaced by the caller as
    /// `LinkedAccountAlreadyExists` — owner id is unique per (project, app).
    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        app_id: Uuid,
        owner_id: &str,
        security_scheme: SecurityScheme,
        security_credentials: &serde_json::Value,
    ) -> Result<LinkedAccount>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LinkedAccount>(
            r#"
            INSERT INTO linked_accounts
                (id, project_id, app_id, linked_account_owner_id, security_scheme,
                 security_credentials, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, true)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(app_id)
        .bind(owner_id)
        .bind(security_scheme)
        .bind(security_credentials)
        .fetch_one(executor)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::linked_account_already_exists(format!(
                    "linked account already exists for owner {owner_id} on app {app_id}"
                ))
            }
            _ => Error::from(e),
        })
    }

    pub async fn update_credentials<'e, E>(
        executor: E,
        id: Uuid,
        security_credentials: &serde_json::Value,
    ) -> Result<Option<LinkedAccount>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LinkedAccount>(
            "UPDATE linked_accounts SET security_credentials = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(security_credentials)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn set_enabled<'e, E>(executor: E, id: Uuid, enabled: bool) -> Result<Option<LinkedAccount>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LinkedAccount>(
            "UPDATE linked_accounts SET enabled = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(enabled)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn update_last_used_at<'e, E>(executor: E, id: Uuid) -> Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE linked_accounts SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM linked_accounts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
