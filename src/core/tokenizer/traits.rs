use crate::core::error::TokenizeError;

pub type TokenizeResult<T> = std::result::Result<T, TokenizeError>;

/// A loaded tokenizer resource.
///
/// Implementations are immutable once constructed and are invoked
/// concurrently from the blocking pool without further synchronization.
pub trait Tokenizer: Send + Sync {
    /// Human-readable subword pieces, without special tokens.
    fn tokenize(&self, text: &str) -> TokenizeResult<Vec<String>>;

    /// Vocabulary ids, including whatever special tokens the model adds.
    fn encode(&self, text: &str) -> TokenizeResult<Vec<u32>>;
}

/// Output of running both capabilities over one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens: Vec<String>,
    pub ids: Vec<u32>,
}

impl Tokenized {
    pub fn run(tokenizer: &dyn Tokenizer, text: &str) -> TokenizeResult<Self> {
        let ids = tokenizer.encode(text)?;
        let tokens = tokenizer.tokenize(text)?;
        Ok(Self { tokens, ids })
    }

    /// The id sequence is authoritative for counting.
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}
