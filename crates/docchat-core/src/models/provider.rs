use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// AI providers whose keys can be recognized by format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Groq,
    OpenAi,
    Anthropic,
}

/// Key prefixes in match order. More specific prefixes must come before
/// shorter ones they extend (`sk-ant-` before `sk-`).
const KEY_SIGNATURES: &[(&str, Provider)] = &[
    ("gsk_", Provider::Groq),
    ("sk-ant-", Provider::Anthropic),
    ("sk-", Provider::OpenAi),
];

impl Provider {
    /// Identifier used by the backend.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Groq => "Groq",
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Guess the provider from an API key's literal prefix.
/// `None` means the user has to pick the provider by hand.
pub fn detect_provider(api_key: &str) -> Option<Provider> {
    let key = api_key.trim();
    KEY_SIGNATURES
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(_, provider)| *provider)
}

/// Provider entry from `GET /api/providers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub models: Vec<String>,
    pub default_model: Option<String>,
    #[serde(default)]
    pub requires_key: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<ProviderInfo>,
}
