use thiserror::Error;

/// Why a tokenizer could not be produced for a model identifier.
///
/// Cloned into every caller waiting on the same in-flight load, so it carries
/// rendered messages rather than the provider's error values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("tokenizer not found for '{model_id}': {message}")]
    NotFound { model_id: String, message: String },

    #[error("failed to fetch tokenizer for '{model_id}': {message}")]
    Fetch { model_id: String, message: String },

    #[error("failed to parse tokenizer for '{model_id}': {message}")]
    Parse { model_id: String, message: String },

    #[error("loading tokenizer for '{model_id}' timed out after {millis}ms")]
    Timeout { model_id: String, millis: u64 },

    #[error("tokenizer load for '{model_id}' aborted: {message}")]
    Worker { model_id: String, message: String },
}

/// Failure raised by a loaded tokenizer on a particular input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TokenizeError(pub String);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to load {model_id}")]
    Load {
        model_id: String,
        #[source]
        source: LoadError,
    },

    #[error("Tokenization failed for {model_id}")]
    Tokenize { model_id: String, message: String },

    #[error("Tokenization worker failed: {0}")]
    Worker(String),
}

impl ServiceError {
    /// Only malformed requests are the caller's fault; everything else is a
    /// dependency or server failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidInput(_))
    }

    /// Underlying cause, rendered for the `details` field of error payloads.
    pub fn details(&self) -> Option<String> {
        match self {
            ServiceError::InvalidInput(_) => None,
            ServiceError::Load { source, .. } => Some(source.to_string()),
            ServiceError::Tokenize { message, .. } => Some(message.clone()),
            ServiceError::Worker(message) => Some(message.clone()),
        }
    }
}
