//! Request handlers for API endpoints

pub mod app_configurations;
pub mod apps;
pub mod functions;
pub mod health;
pub mod helpers;
pub mod linked_accounts;

// Note: For utoipa to work properly with #[utoipa::path] macros, we need to use
// wildcard re-exports so the generated __path_* types are also accessible.
pub use app_configurations::*;
pub use apps::*;
pub use functions::*;
pub use health::*;
pub use linked_accounts::*;

// Note: helpers module is not re-exported to avoid polluting the namespace
// Import helpers directly: use crate::handlers::helpers::{...}
