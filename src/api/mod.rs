use anyhow::{bail, Result};
use serde::de::DeserializeOwned;

pub mod types;

pub use types::{
    CacheResponse, ClearCacheResponse, ErrorResponse, HealthResponse, TokenizeRequest,
    TokenizeResponse,
};

/// HTTP client for a running tokenizer service.
pub struct Client {
    base_url: String,
    client: reqwest::Client,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(crate::envconfig::EnvConfig::from_env().host.base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn tokenize(&self, text: &str, model_id: &str) -> Result<TokenizeResponse> {
        let url = format!("{}/tokenize", self.base_url);
        let request = TokenizeRequest {
            text: text.to_string(),
            model_id: model_id.to_string(),
        };
        let response = self.client.post(&url).json(&request).send().await?;
        decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    pub async fn cache(&self) -> Result<CacheResponse> {
        let url = format!("{}/cache", self.base_url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    pub async fn clear_cache(&self) -> Result<ClearCacheResponse> {
        let url = format!("{}/cache", self.base_url);
        let response = self.client.delete(&url).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(ErrorResponse { error, details: Some(details) }) => {
            bail!("{} ({}): {}", error, status, details)
        }
        Ok(ErrorResponse { error, details: None }) => bail!("{} ({})", error, status),
        Err(_) => bail!("Request failed: {} {}", status, body),
    }
}
