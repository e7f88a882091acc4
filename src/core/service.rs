use std::sync::Arc;

use crate::core::cache::TokenizerCache;
use crate::core::coordinator::LoadCoordinator;
use crate::core::error::ServiceError;
use crate::core::tokenizer::Tokenized;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeOutput {
    pub token_count: usize,
    pub tokens: Vec<String>,
    pub token_ids: Vec<u32>,
}

/// Turns text into tokens and ids with a named tokenizer, loading it through
/// the coordinator on first use.
#[derive(Clone)]
pub struct TokenizeService {
    coordinator: LoadCoordinator,
    normalize_ids: bool,
}

impl TokenizeService {
    pub fn new(coordinator: LoadCoordinator) -> Self {
        Self {
            coordinator,
            normalize_ids: false,
        }
    }

    /// Trim whitespace and trailing slashes off identifiers before lookup,
    /// so `"gpt2/ "` and `"gpt2"` share a cache entry.
    pub fn normalize_ids(mut self, enabled: bool) -> Self {
        self.normalize_ids = enabled;
        self
    }

    pub fn coordinator(&self) -> &LoadCoordinator {
        &self.coordinator
    }

    pub fn cache(&self) -> &Arc<TokenizerCache> {
        self.coordinator.cache()
    }

    pub async fn tokenize(&self, text: &str, model_id: &str) -> Result<TokenizeOutput, ServiceError> {
        let model_id = if self.normalize_ids {
            normalize_model_id(model_id)
        } else {
            model_id
        };

        if text.is_empty() || model_id.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Missing text or modelId parameter".to_string(),
            ));
        }

        let tokenizer = self
            .coordinator
            .acquire(model_id)
            .await
            .map_err(|source| ServiceError::Load {
                model_id: model_id.to_string(),
                source,
            })?;

        let owned_text = text.to_string();
        let tokenized = tokio::task::spawn_blocking(move || Tokenized::run(tokenizer.as_ref(), &owned_text))
            .await
            .map_err(|e| ServiceError::Worker(e.to_string()))?
            .map_err(|e| ServiceError::Tokenize {
                model_id: model_id.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(model_id, tokens = tokenized.count(), "Tokenized text");

        Ok(TokenizeOutput {
            token_count: tokenized.count(),
            tokens: tokenized.tokens,
            token_ids: tokenized.ids,
        })
    }

    pub fn cache_size(&self) -> usize {
        self.cache().size()
    }

    pub fn cached_models(&self) -> Vec<String> {
        self.cache().list()
    }

    pub fn clear_cache(&self) -> usize {
        let cleared = self.cache().clear();
        tracing::info!("Cleared {} tokenizers from cache", cleared);
        cleared
    }
}

pub fn normalize_model_id(model_id: &str) -> &str {
    model_id.trim().trim_end_matches('/')
}
