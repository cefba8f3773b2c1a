//! Business logic services for the control plane, separate from HTTP
//! handlers and database access.

pub mod credential_codec;
pub mod credential_resolver;
pub mod discovery;
pub mod embeddings;
pub mod oauth2;
pub mod policy_judge;
pub mod processor;

pub use credential_resolver::ResolvedCredentials;
pub use discovery::DiscoveryService;
pub use embeddings::EmbeddingsClient;
pub use oauth2::Oauth2Orchestrator;
pub use policy_judge::PolicyJudge;
