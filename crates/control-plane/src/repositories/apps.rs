//! App storage, including cosine-distance semantic search (§4.3, §4.10).

use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::App;

pub struct AppRepository;

impl AppRepository {
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<App>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, App>("SELECT * FROM apps WHERE name = $1")
            .bind(name)
            .fetch_optional(executor)
            .await
            .map_err(Error::from)
    }

    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<App>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, App>(
            "SELECT * FROM apps WHERE active = true ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .map_err(Error::from)
    }

    /// Ranks by cosine distance to `embedding` (pgvector's `<=>` operator)
    /// when given, otherwise falls back to name order. `embedding` is bound
    /// as a pgvector literal (`[0.1,0.2,...]`) since the workspace doesn't
    /// carry a dedicated pgvector client crate.
    pub async fn search<'e, E>(
        executor: E,
        embedding: Option<&[f32]>,
        categories: &[String],
        active_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<App>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category_filter = if categories.is_empty() {
            String::new()
        } else {
            " AND categories && $4".to_string()
        };

        let query = match embedding {
            Some(vector) => {
                let literal = vector_literal(vector);
                format!(
                    "SELECT * FROM apps WHERE (visibility = 'public' OR NOT $3){category_filter} \
                     ORDER BY embedding <=> '{literal}' LIMIT $1 OFFSET $2"
                )
            }
            None => format!(
                "SELECT * FROM apps WHERE (visibility = 'public' OR NOT $3){category_filter} \
                 ORDER BY name LIMIT $1 OFFSET $2"
            ),
        };

        let mut built = sqlx::query_as::<_, App>(&query).bind(limit).bind(offset).bind(active_only);
        if !categories.is_empty() {
            built = built.bind(categories);
        }
        built.fetch_all(executor).await.map_err(Error::from)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<App>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, App>("SELECT * FROM apps WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(Error::from)
    }
}

/// Renders an embedding as a pgvector array literal, e.g. `[0.1,0.2]`.
pub(crate) fn vector_literal(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len() * 8 + 2);
    out.push('[');
    for (i, value) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}
