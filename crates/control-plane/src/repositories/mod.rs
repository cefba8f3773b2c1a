//! Repository layer for database access — the entity store (§4.3).

pub mod agents;
pub mod app_configurations;
pub mod apps;
pub mod functions;
pub mod linked_accounts;
pub mod projects;
pub mod secrets;

// Re-exports for commonly used repositories
pub use agents::{AgentRepository, ApiKeyRepository, CreatedApiKey};
pub use app_configurations::AppConfigurationRepository;
pub use apps::AppRepository;
pub use functions::FunctionRepository;
pub use linked_accounts::LinkedAccountRepository;
pub use projects::ProjectRepository;
pub use secrets::SecretRepository;
