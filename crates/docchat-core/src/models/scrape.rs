use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScrapeMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for ScrapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeMethod::Get => f.write_str("GET"),
            ScrapeMethod::Post => f.write_str("POST"),
        }
    }
}

impl FromStr for ScrapeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(ScrapeMethod::Get),
            "POST" => Ok(ScrapeMethod::Post),
            other => Err(format!("Unsupported scrape method: {}", other)),
        }
    }
}

/// Body for `POST /api/scrape`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeRequest {
    pub url: String,
    /// Store the scraped text as a document.
    pub save: bool,
    /// Fields to submit when scraping a form.
    pub form_data: Option<BTreeMap<String, String>>,
    pub method: ScrapeMethod,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    pub fn with_form(mut self, method: ScrapeMethod, form_data: BTreeMap<String, String>) -> Self {
        self.method = method;
        self.form_data = if form_data.is_empty() { None } else { Some(form_data) };
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    /// Set when the content was saved as a document.
    pub document_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_request_defaults() {
        let json = serde_json::to_value(ScrapeRequest::new("https://example.com")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "https://example.com", "save": false, "form_data": null, "method": "GET"})
        );
    }

    #[test]
    fn test_scrape_method_parse() {
        assert_eq!("post".parse::<ScrapeMethod>(), Ok(ScrapeMethod::Post));
        assert!("PATCH".parse::<ScrapeMethod>().is_err());
    }
}
