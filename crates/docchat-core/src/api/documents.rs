use std::path::Path;

use reqwest::multipart;
use tracing::debug;

use crate::models::document::DocumentEnvelope;
use crate::models::{Document, DocumentListResponse, DocumentSummary, UploadResponse};

use super::{ApiClient, ApiError};

impl ApiClient {
    /// Fetch the documents uploaded or scraped by the current user
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let response: DocumentListResponse = self.get("/api/documents").await?;
        debug!(count = response.documents.len(), "Documents listed");
        Ok(response.documents)
    }

    /// Fetch a single document with its full text
    pub async fn get_document(&self, document_id: &str) -> Result<Document, ApiError> {
        super::require_id(document_id, "Document id is required")?;
        let envelope: DocumentEnvelope = self.get(&format!("/api/documents/{}", document_id)).await?;
        Ok(envelope.into_document())
    }

    /// Upload raw bytes as a document under the given file name
    pub async fn upload_document(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ApiError> {
        super::require(filename, "File name is required")?;
        if bytes.is_empty() {
            return Err(ApiError::Validation("Please select a file to upload".to_string()));
        }
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        self.post_multipart("/api/documents/upload", form).await
    }

    /// Read a file from disk and upload it
    pub async fn upload_document_file(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::Validation(format!("Not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
        self.upload_document(filename, bytes).await
    }
}
