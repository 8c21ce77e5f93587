//! REST API client for the docchat backend.
//!
//! `ApiClient` owns the request pipeline (bearer token attachment and
//! 401 handling). The feature callers are `impl ApiClient` blocks grouped
//! by backend area, each issuing a single request.
//!
//! Required fields are checked locally and rejected with
//! `ApiError::Validation` before anything reaches the network.

pub mod auth;
pub mod chat;
pub mod client;
pub mod documents;
pub mod error;
pub mod keys;
pub mod scrape;

pub use auth::{Credentials, LoginResponse, RegisterResponse, Registration};
pub use client::{ApiClient, RequestContext, DEFAULT_API_URL};
pub use error::ApiError;

/// Reject blank required fields.
pub(crate) fn require(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// Reject ids that are blank or would not stay a single path segment.
pub(crate) fn require_id(value: &str, message: &str) -> Result<(), ApiError> {
    require(value, message)?;
    if value
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace() || c.is_control())
    {
        return Err(ApiError::Validation(format!("Invalid id: {}", value)));
    }
    Ok(())
}
