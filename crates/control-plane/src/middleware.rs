//! Middleware for the control plane.

pub mod auth_pipeline;
pub mod cors;
pub mod ip_extractor;
pub mod metrics;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth_pipeline::{AuthPipeline, RequestContext};
pub use cors::cors;
pub use ip_extractor::extract_ip;
pub use rate_limit::IpRateLimit;
pub use request_id::RequestId;
pub use security_headers::SecurityHeaders;
