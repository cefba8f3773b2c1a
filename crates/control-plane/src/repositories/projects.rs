//! Project storage, including the quota row-lock pattern (§4.4 step 3).

use chrono::{DateTime, Duration, Utc};
use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::Project;

pub struct ProjectRepository;

impl ProjectRepository {
    pub async fn find_by_id<'e, E>(executor: E, project_id: Uuid) -> Result<Option<Project>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(executor)
            .await
            .map_err(Error::from)
    }

    /// Loads the Project that owns the Agent behind `api_key_id`, locking
    /// the row so the quota check-then-increment in
    /// [`ProjectRepository::increase_quota_usage`] is race-free across
    /// concurrent requests for the same Project. Must be called inside a
    /// transaction.
    pub async fn find_for_update_by_api_key_id(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        api_key_id: Uuid,
    ) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT projects.* FROM projects
            JOIN agents ON agents.project_id = projects.id
            JOIN api_keys ON api_keys.agent_id = agents.id
            WHERE api_keys.id = $1
            FOR UPDATE OF projects
            "#,
        )
        .bind(api_key_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::from)
    }

    /// Resets the window if 24h have elapsed since `daily_quota_reset_at`,
    /// otherwise rejects once `daily_quota_used >= daily_quota_limit`.
    /// Always increments `total_quota_used`. The caller must hold the row
    /// lock from [`ProjectRepository::find_for_update_by_api_key_id`] and
    /// commit the surrounding transaction before doing any downstream work.
    pub async fn increase_quota_usage(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        project: &Project,
        now: DateTime<Utc>,
        daily_quota_limit: i64,
    ) -> Result<Project> {
        let window_elapsed = now - project.daily_quota_reset_at >= Duration::hours(24);

        if window_elapsed {
            return sqlx::query_as::<_, Project>(
                r#"
                UPDATE projects SET
                    daily_quota_used = 1,
                    daily_quota_reset_at = $2,
                    total_quota_used = total_quota_used + 1,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(project.id)
            .bind(now)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::from);
        }

        if project.daily_quota_used >= daily_quota_limit {
            return Err(Error::daily_quota_exceeded(format!(
                "project {} has used {}/{} of its daily quota",
                project.id, project.daily_quota_used, daily_quota_limit
            )));
        }

        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                daily_quota_used = daily_quota_used + 1,
                total_quota_used = total_quota_used + 1,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(project.id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Visibility;

    fn sample_project(daily_quota_used: i64, reset_at: DateTime<Utc>) -> Project {
        Project {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            name: "proj".into(),
            visibility_access: Visibility::Private,
            daily_quota_used,
            daily_quota_reset_at: reset_at,
            total_quota_used: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn window_elapsed_detection_matches_24h_boundary() {
        let project = sample_project(5, Utc::now() - Duration::hours(25));
        assert!(Utc::now() - project.daily_quota_reset_at >= Duration::hours(24));

        let project = sample_project(5, Utc::now() - Duration::hours(1));
        assert!(Utc::now() - project.daily_quota_reset_at < Duration::hours(24));
    }
}
