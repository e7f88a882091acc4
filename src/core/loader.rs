use std::path::{Path, PathBuf};
use std::sync::Arc;

use hf_hub::api::sync::{ApiBuilder, ApiError};

use crate::core::error::LoadError;
use crate::core::tokenizer::{HfTokenizer, Tokenizer};

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Produces a ready tokenizer for a model identifier.
///
/// `load` is synchronous and may block on network or disk; callers run it on
/// the blocking pool.
pub trait TokenizerLoader: Send + Sync {
    fn load(&self, model_id: &str) -> Result<Arc<dyn Tokenizer>, LoadError>;
}

/// Resolves identifiers against the Hugging Face Hub, and optionally the
/// local filesystem first.
///
/// With local resolution enabled, a path to a file is read as a
/// `tokenizer.json` and a path to a directory must contain one. Anything else
/// is treated as a Hub repository id. Local resolution is off by default so
/// request identifiers cannot reach the server's filesystem.
#[derive(Debug, Clone, Default)]
pub struct HubLoader {
    token: Option<String>,
    cache_dir: Option<PathBuf>,
    allow_local: bool,
}

impl HubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub credentials and cache location from `HF_TOKEN` / `HF_HUB_CACHE`.
    pub fn from_env() -> Self {
        let mut loader = Self::new().token(std::env::var("HF_TOKEN").ok());
        if let Ok(dir) = std::env::var("HF_HUB_CACHE") {
            loader = loader.cache_dir(dir);
        }
        loader
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cache_dir = (!dir.as_os_str().is_empty()).then_some(dir);
        self
    }

    pub fn allow_local(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self
    }

    fn local_path<'a>(&self, model_id: &'a str) -> Option<&'a Path> {
        let path = Path::new(model_id);
        (self.allow_local && path.exists()).then_some(path)
    }

    fn load_local(&self, model_id: &str, path: &Path) -> Result<Arc<dyn Tokenizer>, LoadError> {
        let file = if path.is_dir() {
            path.join(TOKENIZER_FILE)
        } else {
            path.to_path_buf()
        };

        if !file.is_file() {
            return Err(LoadError::NotFound {
                model_id: model_id.to_string(),
                message: format!("{} does not exist", file.display()),
            });
        }

        parse(model_id, &file)
    }

    fn load_remote(&self, model_id: &str) -> Result<Arc<dyn Tokenizer>, LoadError> {
        let mut builder = ApiBuilder::new()
            .with_progress(false)
            .with_token(self.token.clone());
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }

        let api = builder.build().map_err(|e| LoadError::Fetch {
            model_id: model_id.to_string(),
            message: e.to_string(),
        })?;

        let file = api
            .model(model_id.to_string())
            .get(TOKENIZER_FILE)
            .map_err(|e| classify_fetch_error(model_id, e))?;

        parse(model_id, &file)
    }
}

impl TokenizerLoader for HubLoader {
    fn load(&self, model_id: &str) -> Result<Arc<dyn Tokenizer>, LoadError> {
        match self.local_path(model_id) {
            Some(path) => {
                tracing::debug!(model_id, "Loading tokenizer from local path");
                self.load_local(model_id, path)
            }
            None => {
                tracing::debug!(model_id, "Fetching tokenizer from the Hub");
                self.load_remote(model_id)
            }
        }
    }
}

fn parse(model_id: &str, file: &Path) -> Result<Arc<dyn Tokenizer>, LoadError> {
    let tokenizer = HfTokenizer::from_file(file).map_err(|message| LoadError::Parse {
        model_id: model_id.to_string(),
        message,
    })?;
    Ok(Arc::new(tokenizer))
}

// Unauthenticated requests for a missing repository come back as 401 from the
// Hub, so both statuses mean "no such tokenizer". Only HTTP status failures
// carry a code; transport and I/O errors are plain fetch failures.
fn classify_fetch_error(model_id: &str, err: ApiError) -> LoadError {
    let message = err.to_string();
    let status = match &err {
        ApiError::RequestError(_) => http_status(&message),
        _ => None,
    };
    fetch_error(model_id, status, message)
}

fn fetch_error(model_id: &str, status: Option<u16>, message: String) -> LoadError {
    match status {
        Some(401) | Some(404) => LoadError::NotFound {
            model_id: model_id.to_string(),
            message,
        },
        _ => LoadError::Fetch {
            model_id: model_id.to_string(),
            message,
        },
    }
}

// ureq renders status failures as "<url>: status code <n>". Repository ids
// cannot contain spaces, so the marker never comes from the id itself.
fn http_status(message: &str) -> Option<u16> {
    let (_, rest) = message.rsplit_once("status code ")?;
    rest.split(|c: char| !c.is_ascii_digit()).next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDLEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "hello": 1, "world": 2},
            "unk_token": "[UNK]"
        }
    }"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tokserve-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_from_directory() {
        let dir = scratch_dir("dir");
        std::fs::write(dir.join(TOKENIZER_FILE), WORDLEVEL_JSON).unwrap();

        let loader = HubLoader::new().allow_local(true);
        let tokenizer = loader.load(dir.to_str().unwrap()).unwrap();
        assert_eq!(tokenizer.encode("hello world").unwrap(), vec![1, 2]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = scratch_dir("file");
        let file = dir.join("custom.json");
        std::fs::write(&file, WORDLEVEL_JSON).unwrap();

        let tokenizer = HubLoader::new().allow_local(true).load(file.to_str().unwrap()).unwrap();
        assert_eq!(tokenizer.tokenize("hello world").unwrap(), vec!["hello", "world"]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_directory_without_definition() {
        let dir = scratch_dir("empty");
        let err = HubLoader::new().allow_local(true).load(dir.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, LoadError::NotFound { .. }));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_malformed_definition() {
        let dir = scratch_dir("bad");
        std::fs::write(dir.join(TOKENIZER_FILE), "{\"model\": 3}").unwrap();

        let err = HubLoader::new().allow_local(true).load(dir.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, LoadError::Parse { .. }));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_local_paths_need_opt_in() {
        let dir = scratch_dir("optin");
        let id = dir.to_str().unwrap();

        assert!(HubLoader::new().local_path(id).is_none());
        assert!(HubLoader::from_env().local_path(id).is_none());
        assert_eq!(HubLoader::new().allow_local(true).local_path(id), Some(dir.as_path()));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_builder_ignores_empty_values() {
        let loader = HubLoader::new().token(Some(String::new())).cache_dir("");
        assert!(loader.token.is_none());
        assert!(loader.cache_dir.is_none());

        let loader = HubLoader::new().token(Some("hf_abc".into())).cache_dir("/tmp/hub");
        assert_eq!(loader.token.as_deref(), Some("hf_abc"));
        assert_eq!(loader.cache_dir, Some(PathBuf::from("/tmp/hub")));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(
            http_status("https://huggingface.co/gpt2/resolve/main/tokenizer.json: status code 404"),
            Some(404)
        );
        assert_eq!(
            http_status("https://huggingface.co/org/bert-401/resolve/main/tokenizer.json: Connection refused"),
            None
        );
        assert_eq!(http_status("status code 503 (Service Unavailable)"), Some(503));
    }

    #[test]
    fn test_classification_ignores_digits_in_id() {
        let message = "https://huggingface.co/org/model-404/resolve/main/tokenizer.json: status code 500".to_string();
        let err = fetch_error("org/model-404", http_status(&message), message);
        assert!(matches!(err, LoadError::Fetch { .. }));

        let err = fetch_error("org/model-404", None, "org/model-404: timed out".into());
        assert!(matches!(err, LoadError::Fetch { .. }));

        let err = fetch_error("gpt3", Some(401), "status code 401".into());
        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
