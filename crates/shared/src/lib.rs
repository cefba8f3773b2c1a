//! Shared library for the agent-integration control plane
//!
//! This crate provides common functionality used by `control-plane`:
//! - Database connection pooling and utilities
//! - Error handling types
//! - Configuration management
//! - Logging infrastructure
//! - Envelope-encryption keyring and HMAC keying (§4.1)
//! - Edge rate limiting (§5)
//! - Secrets-backend loading (env/AWS Secrets Manager/Vault)

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod redis;
pub mod secrets;

// Re-export commonly used types
pub use config::Config;
pub use crypto::{hmac_eq, hmac_sha256, CryptoError, Keyring};
pub use db::DbPool;
pub use error::{Error, Result};

/// Initialize tracing subscriber for structured logging
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shared=debug,control_plane=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
