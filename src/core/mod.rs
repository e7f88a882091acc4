pub mod tokenizer;
pub mod cache;
pub mod loader;
pub mod coordinator;
pub mod service;
pub mod error;
#[doc(hidden)]
pub mod testing;

pub use tokenizer::{Tokenizer, Tokenized, HfTokenizer};
pub use cache::{TokenizerCache, CacheEntry};
pub use loader::{TokenizerLoader, HubLoader};
pub use coordinator::{LoadCoordinator, LoadOutcome};
pub use service::{TokenizeService, TokenizeOutput};
pub use error::{LoadError, ServiceError, TokenizeError};

pub type Result<T> = anyhow::Result<T>;
