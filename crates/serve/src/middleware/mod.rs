//! Middleware module for ItemSearch serve crate
//!
//! Provides the API token guard, security headers, and request id and timing
//! instrumentation.

pub mod auth;
pub mod request;
pub mod security;

pub use auth::{presented_token, require_api_token};
pub use request::{request_id_middleware, timing_middleware, REQUEST_ID_HEADER};
pub use security::{cors_layer, security_headers_middleware};
