use tracing::debug;

use crate::models::{ChatRequest, ChatResponse};

use super::{require, ApiClient, ApiError};

impl ApiClient {
    /// Send one chat message and return the assistant's reply
    pub async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        require(&request.message, "Message is required")?;
        debug!(
            provider = request.provider.as_deref().unwrap_or("default"),
            with_document = request.document_id.is_some(),
            "Sending chat message"
        );
        self.post("/api/chat", request).await
    }
}
