use std::path::Path;

use super::traits::{Tokenizer, TokenizeResult};
use crate::core::error::TokenizeError;

/// Adapter over a Hugging Face `tokenizers` definition (`tokenizer.json`).
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    pub fn new(inner: tokenizers::Tokenizer) -> Self {
        Self { inner }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        tokenizers::Tokenizer::from_file(path)
            .map(Self::new)
            .map_err(|e| e.to_string())
    }

    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, String> {
        tokenizers::Tokenizer::from_bytes(bytes)
            .map(Self::new)
            .map_err(|e| e.to_string())
    }
}

impl Tokenizer for HfTokenizer {
    fn tokenize(&self, text: &str) -> TokenizeResult<Vec<String>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| TokenizeError(e.to_string()))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn encode(&self, text: &str) -> TokenizeResult<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| TokenizeError(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}
