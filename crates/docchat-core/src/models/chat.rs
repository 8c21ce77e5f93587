use serde::{Deserialize, Serialize};

/// Body for `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub document_id: Option<String>,
    /// Document text to ground the answer in.
    pub context: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Explicit key; when absent the backend uses the user's default key.
    pub api_key: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document_id: impl Into<String>, context: Option<String>) -> Self {
        self.document_id = Some(document_id.into());
        self.context = context;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>, model: Option<String>) -> Self {
        self.provider = Some(provider.into());
        self.model = model;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub conversation_id: Option<String>,
}
