//! Function storage (§4.3, §4.10). Search and lookup enforce that both the
//! Function and its owning App satisfy the visibility/active policy —
//! neither is sufficient on its own.

use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::Function;

pub struct FunctionRepository;

impl FunctionRepository {
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Function>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Function>("SELECT * FROM functions WHERE name = $1")
            .bind(name)
            .fetch_optional(executor)
            .await
            .map_err(Error::from)
    }

    /// Same lookup, but only returns the row if both it and its owning App
    /// are public and active — used for unauthenticated discovery.
    pub async fn find_public_active_by_name<'e, E>(
        executor: E,
        name: &str,
    ) -> Result<Option<Function>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Function>(
            r#"
            SELECT functions.* FROM functions
            JOIN apps ON apps.id = functions.app_id
            WHERE functions.name = $1
              AND functions.visibility = 'public' AND functions.active = true
              AND apps.visibility = 'public' AND apps.active = true
            "#,
        )
        .bind(name)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn find_by_app_id<'e, E>(executor: E, app_id: Uuid) -> Result<Vec<Function>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Function>("SELECT * FROM functions WHERE app_id = $1 ORDER BY name")
            .bind(app_id)
            .fetch_all(executor)
            .await
            .map_err(Error::from)
    }

    /// Ranks by cosine distance to `embedding` when given (pgvector `<=>`),
    /// restricted to public+active Functions whose owning App is also
    /// public+active.
    pub async fn search<'e, E>(
        executor: E,
        embedding: Option<&[f32]>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Function>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let base = r#"
            SELECT functions.* FROM functions
            JOIN apps ON apps.id = functions.app_id
            WHERE functions.visibility = 'public' AND functions.active = true
              AND apps.visibility = 'public' AND apps.active = true
        "#;

        let query = match embedding {
            Some(vector) => {
                let literal = super::apps::vector_literal(vector);
                format!("{base} ORDER BY functions.embedding <=> '{literal}' LIMIT $1 OFFSET $2")
            }
            None => format!("{base} ORDER BY functions.name LIMIT $1 OFFSET $2"),
        };

        sqlx::query_as::<_, Function>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
            .map_err(Error::from)
    }
}
