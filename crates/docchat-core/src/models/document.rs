use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Entry from `GET /api/documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    #[serde(alias = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentListResponse {
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
}

/// Full document from `GET /api/documents/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub full_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

impl Document {
    /// The untruncated text when the backend sent it, else the stored content.
    pub fn text(&self) -> &str {
        self.full_content
            .as_deref()
            .or(self.content.as_deref())
            .unwrap_or("")
    }
}

/// `GET /api/documents/:id` has been served both bare and wrapped in
/// `{"document": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DocumentEnvelope {
    Wrapped { document: Document },
    Bare(Document),
}

impl DocumentEnvelope {
    pub(crate) fn into_document(self) -> Document {
        match self {
            DocumentEnvelope::Wrapped { document } => document,
            DocumentEnvelope::Bare(document) => document,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    /// Processed document as stored by the backend; shape varies by file type.
    #[serde(default)]
    pub document: serde_json::Value,
}

/// Timestamps arrive as naive ISO-8601 (`2024-05-01T10:00:00.123456`) or
/// with an offset. Anything unparseable becomes `None` rather than failing
/// the whole listing.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        s.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.naive_utc()))
            .or_else(|| {
                debug!(value = %s, "Unrecognized timestamp format");
                None
            })
    }))
}
