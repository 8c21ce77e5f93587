use serde::{Deserialize, Serialize};

use super::bool_or_int;

/// Stored provider key from `GET /api/api-keys`. The backend masks
/// `api_key` before sending it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(alias = "_id")]
    pub id: String,
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub is_default: bool,
}

impl ApiKey {
    /// Label like `Work (sk-1...cdef) ★`, showing only the ends of the key.
    pub fn display_label(&self) -> String {
        let name = match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name,
            None if self.is_default => "Default Key",
            None => "API Key",
        };
        let star = if self.is_default { " ★" } else { "" };
        format!("{} ({}){}", name, mask_key(&self.api_key), star)
    }
}

/// First and last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeysResponse {
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

/// Body for `POST /api/api-keys`.
#[derive(Debug, Clone, Serialize)]
pub struct NewApiKey {
    pub api_key: String,
    pub provider: String,
    pub is_default: bool,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddApiKeyResponse {
    #[serde(default)]
    pub message: String,
    pub key_id: String,
    pub provider: String,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub is_default: bool,
    #[serde(default)]
    pub name: Option<String>,
}
