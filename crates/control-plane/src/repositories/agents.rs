//! Agent and API Key storage (§4.3, §4.4).
//!
//! An Agent and its one API Key are created atomically in a single
//! transaction, mirroring `repositories/api_keys.rs`'s
//! `create_with_executor` generic-over-`Executor` pattern so both inserts
//! share one `Transaction<Postgres>` when called from a handler.

use rand::RngCore;
use shared::crypto::{hmac_eq, hmac_sha256, Keyring};
use shared::error::{Error, Result};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::entities::{Agent, ApiKey};
use crate::models::enums::ApiKeyStatus;

pub struct AgentRepository;

impl AgentRepository {
    pub async fn find_by_id<'e, E>(executor: E, agent_id: Uuid) -> Result<Option<Agent>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE id = $1")
            .bind(agent_id)
            .fetch_optional(executor)
            .await
            .map_err(Error::from)
    }

    /// Loads the Agent that owns `api_key_id`, used once the API key has
    /// been resolved to an id during authorization (§4.4 step 2).
    pub async fn find_by_api_key_id<'e, E>(executor: E, api_key_id: Uuid) -> Result<Option<Agent>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Agent>(
            r#"
            SELECT agents.* FROM agents
            JOIN api_keys ON api_keys.agent_id = agents.id
            WHERE api_keys.id = $1
            "#,
        )
        .bind(api_key_id)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        name: &str,
        description: &str,
        allowed_apps: &[String],
        custom_instructions: &serde_json::Value,
    ) -> Result<Agent>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO agents (id, project_id, name, description, allowed_apps, custom_instructions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(allowed_apps)
        .bind(custom_instructions)
        .fetch_one(executor)
        .await
        .map_err(Error::from)
    }

    pub async fn update<'e, E>(
        executor: E,
        agent_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        allowed_apps: Option<&[String]>,
        custom_instructions: Option<&serde_json::Value>,
    ) -> Result<Option<Agent>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Agent>(
            r#"
            UPDATE agents SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                allowed_apps = COALESCE($4, allowed_apps),
                custom_instructions = COALESCE($5, custom_instructions),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(agent_id)
        .bind(name)
        .bind(description)
        .bind(allowed_apps)
        .bind(custom_instructions)
        .fetch_optional(executor)
        .await
        .map_err(Error::from)
    }
}

pub struct ApiKeyRepository;

/// Plaintext key shown to the caller exactly once, alongside the row that
/// was persisted for it.
pub struct CreatedApiKey {
    pub plaintext: String,
    pub row: ApiKey,
}

impl ApiKeyRepository {
    /// Generates a random 32-byte key, HMACs it for lookup and envelope
    /// encrypts it for storage, then inserts the row. The plaintext is
    /// returned to the caller and never persisted.
    pub async fn create<'e, E>(
        executor: E,
        agent_id: Uuid,
        keyring: &dyn Keyring,
        hmac_secret: &str,
    ) -> Result<CreatedApiKey>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let plaintext = hex::encode(raw);

        let hmac = hmac_sha256(hmac_secret, &plaintext);
        let ciphertext = keyring
            .encrypt(plaintext.as_bytes())
            .await
            .map_err(|e| Error::unexpected(format!("failed to encrypt api key: {e}")))?;

        let row = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (id, agent_id, ciphertext, hmac, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(agent_id)
        .bind(&ciphertext)
        .bind(&hmac)
        .bind(ApiKeyStatus::Active)
        .fetch_one(executor)
        .await?;

        Ok(CreatedApiKey { plaintext, row })
    }

    /// Resolves a presented plaintext API key to its row by recomputing the
    /// HMAC and looking it up by the indexed digest, then confirming the
    /// match in constant time (§4.4 step 1).
    pub async fn find_by_plaintext<'e, E>(
        executor: E,
        plaintext: &str,
        hmac_secret: &str,
    ) -> Result<Option<ApiKey>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let hmac = hmac_sha256(hmac_secret, plaintext);
        let row = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE hmac = $1")
            .bind(&hmac)
            .fetch_optional(executor)
            .await?;

        Ok(row.filter(|row| hmac_eq(&row.hmac, &hmac)))
    }

    pub async fn set_status<'e, E>(executor: E, api_key_id: Uuid, status: ApiKeyStatus) -> Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE api_keys SET status = $2, updated_at = now() WHERE id = $1")
            .bind(api_key_id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_lookup_rejects_tampered_digest() {
        let secret = "hmac-secret";
        let plaintext = "abc123";
        let real = hmac_sha256(secret, plaintext);
        let tampered = hmac_sha256(secret, "abc124");
        assert!(!hmac_eq(&real, &tampered));
    }
}
