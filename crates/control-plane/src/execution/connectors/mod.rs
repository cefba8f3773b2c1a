//! Built-in connector implementations (§4.8).

pub mod agent_secrets_manager;
pub mod e2b;
pub mod gmail;
pub mod mock;
