use tracing::{debug, info};

use crate::models::{
    detect_provider, AddApiKeyResponse, ApiKey, ApiKeysResponse, MessageResponse, NewApiKey,
    ProviderInfo, ProvidersResponse,
};

use super::{require, require_id, ApiClient, ApiError};

impl ApiClient {
    /// Providers the backend can route chat requests to
    pub async fn list_providers(&self) -> Result<Vec<ProviderInfo>, ApiError> {
        let response: ProvidersResponse = self.get("/api/providers").await?;
        Ok(response.providers)
    }

    /// The current user's stored provider keys (masked by the backend)
    pub async fn list_api_keys(&self) -> Result<Vec<ApiKey>, ApiError> {
        let response: ApiKeysResponse = self.get("/api/api-keys").await?;
        Ok(response.api_keys)
    }

    /// Store a provider key. An explicit `provider` wins; otherwise the
    /// provider is detected from the key's prefix.
    pub async fn add_api_key(
        &self,
        api_key: &str,
        provider: Option<&str>,
        name: Option<&str>,
        is_default: bool,
    ) -> Result<AddApiKeyResponse, ApiError> {
        require(api_key, "API key is required")?;

        let provider = match provider.filter(|p| !p.trim().is_empty()) {
            Some(p) => p.trim().to_string(),
            None => {
                let detected = detect_provider(api_key)
                    .ok_or_else(|| ApiError::Validation("Please select a provider".to_string()))?;
                debug!(provider = %detected, "Provider detected from key prefix");
                detected.id().to_string()
            }
        };

        let body = NewApiKey {
            api_key: api_key.trim().to_string(),
            provider,
            is_default,
            name: name.unwrap_or_default().to_string(),
        };
        let response: AddApiKeyResponse = self.post("/api/api-keys", &body).await?;
        info!(key_id = %response.key_id, provider = %response.provider, "API key added");
        Ok(response)
    }

    pub async fn delete_api_key(&self, key_id: &str) -> Result<MessageResponse, ApiError> {
        require_id(key_id, "API key id is required")?;
        self.delete(&format!("/api/api-keys/{}", key_id)).await
    }

    /// Make this key the default for its provider
    pub async fn set_default_api_key(&self, key_id: &str) -> Result<MessageResponse, ApiError> {
        require_id(key_id, "API key id is required")?;
        self.put(&format!("/api/api-keys/{}/default", key_id)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::client::tests::logged_in_store;
    use crate::api::{ApiClient, ApiError};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_add_api_key_uses_detected_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/api-keys"))
            .and(body_json(serde_json::json!({
                "api_key": "sk-ant-secret",
                "provider": "anthropic",
                "is_default": true,
                "name": ""
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "message": "API key added successfully",
                "key_id": "k1",
                "provider": "anthropic",
                "is_default": true,
                "name": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();
        let resp = client.add_api_key("sk-ant-secret", None, None, true).await.unwrap();
        assert_eq!(resp.key_id, "k1");
    }

    #[tokio::test]
    async fn test_explicit_provider_overrides_detection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/api-keys"))
            .and(body_json(serde_json::json!({
                "api_key": "sk-123",
                "provider": "groq",
                "is_default": false,
                "name": "proxy"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "key_id": "k2", "provider": "groq", "is_default": false, "name": "proxy"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();
        client.add_api_key("sk-123", Some("groq"), Some("proxy"), false).await.unwrap();
    }

    #[tokio::test]
    async fn test_undetected_key_requires_manual_provider() {
        let server = MockServer::start().await;
        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();
        let err = client.add_api_key("xyz", None, None, true).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select a provider");
        let err = client.add_api_key("", Some("groq"), None, true).await.unwrap_err();
        assert_eq!(err.to_string(), "API key is required");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_set_default() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/api-keys/k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "API key deleted successfully"})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/api-keys/k2/default"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "API key not found"})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();
        let deleted = client.delete_api_key("k1").await.unwrap();
        assert_eq!(deleted.message, "API key deleted successfully");

        let err = client.set_default_api_key("k2").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_key_id_cannot_escape_its_path_segment() {
        let server = MockServer::start().await;
        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();

        let err = client.delete_api_key("k1/default").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = client.set_default_api_key("k1?all=1").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_providers_and_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/providers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "providers": [{"id": "openai", "name": "OpenAI", "models": ["gpt-4o"], "default_model": "gpt-4o", "requires_key": true}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/api-keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"api_keys": []})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();
        assert_eq!(client.list_providers().await.unwrap()[0].id, "openai");
        assert!(client.list_api_keys().await.unwrap().is_empty());
    }
}
