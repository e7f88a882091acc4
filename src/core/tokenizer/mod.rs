pub mod traits;
pub mod hf;

pub use traits::{Tokenizer, Tokenized, TokenizeResult};
pub use hf::HfTokenizer;
