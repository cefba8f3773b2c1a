//! App Configuration storage (§4.3).

use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::AppConfiguration;
use crate::models::enums::SecurityScheme;

pub struct AppConfigurationRepository;

impl AppConfigurationRepository {
    pub async fn find_by_project_and_app<'e, E>(
        executor: E,
        project_id: Uuid,
        app_id: Uuid,
    ) -> Result<Option<AppConfiguration>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AppConfiguration>(
            "SELECT * FROM app_configurations WHERE project_id = $1 AND app_id = $2",
        )
        .bind(project_id)
        .bind(app_id)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn list_by_project<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<AppConfiguration>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AppConfiguration>(
            "SELECT * FROM app_configurations WHERE project_id = $1 ORDER BY created_at",
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
        .map_err(Error::from)
    }

    /// Fails with a unique-violation surfaced by the caller as
    /// `AppConfigurationAlreadyExists` — one configuration per (project, app).
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        app_id: Uuid,
        security_scheme: SecurityScheme,
        security_scheme_overrides: &serde_json::Value,
        all_functions_enabled: bool,
        enabled_functions: &[String],
    ) -> Result<AppConfiguration>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AppConfiguration>(
            r#"
            INSERT INTO app_configurations
                (id, project_id, app_id, security_scheme, security_scheme_overrides,
                 enabled, all_functions_enabled, enabled_functions)
            VALUES ($1, $2, $3, $4, $5, true, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(app_id)
        .bind(security_scheme)
        .bind(security_scheme_overrides)
        .bind(all_functions_enabled)
        .bind(enabled_functions)
        .fetch_one(executor)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::app_configuration_already_exists(format!(
                    "app configuration already exists for project {project_id} / app {app_id}"
                ))
            }
            _ => Error::from(e),
        })
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        enabled: Option<bool>,
        security_scheme_overrides: Option<&serde_json::Value>,
        all_functions_enabled: Option<bool>,
        enabled_functions: Option<&[String]>,
    ) -> Result<Option<AppConfiguration>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AppConfiguration>(
            r#"
            UPDATE app_configurations SET
                enabled = COALESCE($2, enabled),
                security_scheme_overrides = COALESCE($3, security_scheme_overrides),
                all_functions_enabled = COALESCE($4, all_functions_enabled),
                enabled_functions = COALESCE($5, enabled_functions),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(enabled)
        .bind(security_scheme_overrides)
        .bind(all_functions_enabled)
        .bind(enabled_functions)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM app_configurations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
