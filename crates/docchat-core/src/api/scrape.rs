use crate::models::{ScrapeRequest, ScrapeResult};

use super::{require, ApiClient, ApiError};

impl ApiClient {
    /// Scrape a page through the backend, optionally saving it as a document
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ApiError> {
        require(&request.url, "Please enter a URL to scrape.")?;
        self.post("/api/scrape", request).await
    }

    /// Run the structured UCR scraper. Payload and result are passed through
    /// untouched.
    pub async fn scrape_ucr(&self, payload: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        if !payload.is_object() {
            return Err(ApiError::Validation("UCR payload must be a JSON object".to_string()));
        }
        self.post("/api/scrape/ucr", payload).await
    }
}
