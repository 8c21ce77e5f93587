//! Payloads exchanged with the docchat backend.
//!
//! Only the fields the client acts on are typed; everything else in a
//! response is ignored, and fully opaque payloads stay `serde_json::Value`.

pub mod api_key;
pub mod chat;
pub mod document;
pub mod provider;
pub mod scrape;

pub use api_key::{AddApiKeyResponse, ApiKey, ApiKeysResponse, NewApiKey};
pub use chat::{ChatRequest, ChatResponse};
pub use document::{Document, DocumentListResponse, DocumentSummary, UploadResponse};
pub use provider::{detect_provider, Provider, ProviderInfo, ProvidersResponse};
pub use scrape::{ScrapeMethod, ScrapeRequest, ScrapeResult};

use serde::{Deserialize, Deserializer};

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Accepts `true`/`false` as well as the `0`/`1` integers some endpoints send.
pub(crate) fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}
