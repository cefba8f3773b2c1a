//! Shared fixtures for the integration tests in this directory.
//!
//! Every fixture inserts directly with `sqlx::query` rather than going
//! through the repository layer's `create` helpers (most entities, e.g.
//! Apps and Functions, are seeded by the discovery pipeline, not an HTTP
//! endpoint, so there's no production "create" call to reuse). The one
//! exception is API keys: [`insert_api_key`] calls the real
//! `ApiKeyRepository::create` so tests exercise the exact encryption and
//! HMAC path `AuthPipeline` will later verify against.

use control_plane::repositories::ApiKeyRepository;
use shared::crypto::{Keyring, LocalKeyring};
use shared::DbPool;
use sqlx::PgPool;
use uuid::Uuid;

/// Connects to a real Postgres instance for integration tests.
///
/// Set `TEST_DATABASE_URL` (falling back to `DATABASE_URL`) before running
/// the tests in this directory; they're `#[ignore]`d by default since CI
/// doesn't provision a database for this crate yet.
pub async fn create_test_pool() -> DbPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set to run these integration tests");

    PgPool::connect(&database_url)
        .await
        .expect("failed to connect to test database")
}

/// An in-memory keyring good enough for one test process; never shared
/// across runs since the key is freshly generated each time.
pub fn test_keyring() -> LocalKeyring {
    LocalKeyring::from_base64_key(&LocalKeyring::generate_key_b64()).expect("generated key is always valid")
}

pub const TEST_HMAC_SECRET: &str = "integration-test-hmac-secret";

pub struct TestProject {
    pub id: Uuid,
    pub org_id: Uuid,
}

impl TestProject {
    pub async fn insert(pool: &DbPool) -> Self {
        let id = Uuid::new_v4();
        let org_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO projects (id, org_id, name, visibility_access, daily_quota_used, daily_quota_reset_at, total_quota_used)
            VALUES ($1, $2, $3, 'private', 0, now(), 0)
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(format!("test-project-{id}"))
        .execute(pool)
        .await
        .expect("failed to insert test project");

        Self { id, org_id }
    }

    /// Inserts a Project that has already exhausted `quota_used` of its
    /// daily allowance, for testing the 429 path without issuing hundreds
    /// of requests.
    pub async fn insert_with_quota_used(pool: &DbPool, quota_used: i64) -> Self {
        let id = Uuid::new_v4();
        let org_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO projects (id, org_id, name, visibility_access, daily_quota_used, daily_quota_reset_at, total_quota_used)
            VALUES ($1, $2, $3, 'private', $4, now(), $4)
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(format!("test-project-{id}"))
        .bind(quota_used)
        .execute(pool)
        .await
        .expect("failed to insert test project");

        Self { id, org_id }
    }
}

pub struct TestAgent {
    pub id: Uuid,
}

impl TestAgent {
    pub async fn insert(pool: &DbPool, project_id: Uuid, allowed_apps: &[&str]) -> Self {
        let id = Uuid::new_v4();
        let allowed: Vec<String> = allowed_apps.iter().map(|s| s.to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO agents (id, project_id, name, description, allowed_apps, custom_instructions)
            VALUES ($1, $2, $3, '', $4, '{}'::jsonb)
            "#,
        )
        .bind(id)
        .bind(project_id)
        .bind(format!("test-agent-{id}"))
        .bind(&allowed)
        .execute(pool)
        .await
        .expect("failed to insert test agent");

        Self { id }
    }
}

/// Creates a real, active API key for `agent_id` through the production
/// repository path and returns the plaintext to send as `X-API-KEY`.
pub async fn insert_api_key(pool: &DbPool, agent_id: Uuid, keyring: &dyn Keyring) -> String {
    ApiKeyRepository::create(pool, agent_id, keyring, TEST_HMAC_SECRET)
        .await
        .expect("failed to insert test api key")
        .plaintext
}

pub struct TestApp {
    pub id: Uuid,
    pub name: String,
}

impl TestApp {
    pub async fn insert(pool: &DbPool, name: &str) -> Self {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO apps (
                id, name, display_name, provider, version, description, logo, categories,
                visibility, active, security_schemes, default_security_credentials_by_scheme, embedding
            )
            VALUES ($1, $2, $2, 'test-provider', '1.0.0', '', NULL, '{}', 'public', true, '{}'::jsonb, '{}'::jsonb, '[]'::jsonb)
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .expect("failed to insert test app");

        Self { id, name: name.to_string() }
    }
}

pub struct TestFunction {
    pub id: Uuid,
    pub name: String,
}

impl TestFunction {
    pub async fn insert(pool: &DbPool, app_id: Uuid, name: &str) -> Self {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO functions (
                id, app_id, name, description, tags, visibility, active, protocol,
                protocol_data, parameters, response, embedding
            )
            VALUES ($1, $2, $3, '', '{}', 'public', true, 'rest', '{}'::jsonb, '{}'::jsonb, '{}'::jsonb, '[]'::jsonb)
            "#,
        )
        .bind(id)
        .bind(app_id)
        .bind(name)
        .execute(pool)
        .await
        .expect("failed to insert test function");

        Self { id, name: name.to_string() }
    }
}

/// Deletes a Project and everything that cascades from it (Agents, API
/// keys, App Configurations, Linked Accounts).
pub async fn cleanup_project(pool: &DbPool, project_id: Uuid) {
    let _ = sqlx::query("DELETE FROM projects WHERE id = $1").bind(project_id).execute(pool).await;
}

pub async fn cleanup_app(pool: &DbPool, app_id: Uuid) {
    let _ = sqlx::query("DELETE FROM apps WHERE id = $1").bind(app_id).execute(pool).await;
}
