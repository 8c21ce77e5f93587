use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized - token may be expired{}", detail(.message))]
    Unauthorized { message: Option<String> },

    #[error("Access denied{}", detail(.message))]
    AccessDenied { message: Option<String> },

    #[error("Resource not found{}", detail(.message))]
    NotFound { message: Option<String> },

    #[error("Request rejected with status {status}{}", detail(.message))]
    Rejected { status: u16, message: Option<String> },

    #[error("Server error {status}{}", detail(.message))]
    ServerError { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The session could not be written to the credential store.
    #[error("Failed to save session: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shape used by the backend for every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the backend's `message` field out of an error body, if it has one.
    fn backend_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::backend_message(body);
        if message.is_none() && !body.is_empty() {
            tracing::debug!(%status, body = %Self::truncate_body(body), "Error response without message");
        }
        match status.as_u16() {
            401 => ApiError::Unauthorized { message },
            403 => ApiError::AccessDenied { message },
            404 => ApiError::NotFound { message },
            code @ 500..=599 => ApiError::ServerError { status: code, message },
            code => ApiError::Rejected { status: code, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Message to show the user: the backend's own message when it sent one,
    /// local validation text as-is, and `fallback` for everything else.
    pub fn user_message(&self, fallback: &str) -> String {
        let backend = match self {
            ApiError::Validation(m) => return m.clone(),
            ApiError::Unauthorized { message }
            | ApiError::AccessDenied { message }
            | ApiError::NotFound { message }
            | ApiError::Rejected { message, .. }
            | ApiError::ServerError { message, .. } => message.as_deref(),
            ApiError::NetworkError(_) | ApiError::InvalidResponse(_) | ApiError::Storage(_) => None,
        };
        backend.unwrap_or(fallback).to_string()
    }
}
