pub mod core;
pub mod api;
pub mod envconfig;
pub mod middleware;
pub mod server;

pub use crate::core::{
    Tokenizer, Tokenized, HfTokenizer,
    TokenizerCache, CacheEntry,
    TokenizerLoader, HubLoader,
    LoadCoordinator, LoadOutcome,
    TokenizeService, TokenizeOutput,
    LoadError, ServiceError, TokenizeError,
    Result,
};

pub use api::Client;
pub use envconfig::EnvConfig;
