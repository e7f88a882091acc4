//! In-memory tokenizers and instrumented loaders for exercising the cache,
//! coordinator and HTTP layer without touching the network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::core::error::{LoadError, TokenizeError};
use crate::core::loader::TokenizerLoader;
use crate::core::tokenizer::{Tokenizer, TokenizeResult};

/// Splits on whitespace; ids are byte lengths. With `bos` set, `encode`
/// prepends a `0` id the way a model with special tokens would.
#[derive(Debug, Default)]
pub struct WhitespaceTokenizer {
    pub bos: bool,
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> TokenizeResult<Vec<String>> {
        if text.contains('\u{0}') {
            return Err(TokenizeError("NUL byte in input".to_string()));
        }
        Ok(text.split_whitespace().map(String::from).collect())
    }

    fn encode(&self, text: &str) -> TokenizeResult<Vec<u32>> {
        let mut ids: Vec<u32> = self
            .tokenize(text)?
            .iter()
            .map(|t| t.len() as u32)
            .collect();
        if self.bos {
            ids.insert(0, 0);
        }
        Ok(ids)
    }
}

/// A one-shot latch that blocks loader threads until released.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock() = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cv.wait(&mut open);
        }
    }
}

/// Loader that counts invocations per identifier.
///
/// Identifiers listed as missing fail with `NotFound`; identifiers with a
/// registered gate block until the gate opens; an optional delay is applied
/// to every load.
#[derive(Default)]
pub struct CountingLoader {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    missing: HashSet<String>,
    gates: HashMap<String, Arc<Gate>>,
    delay: Option<Duration>,
    bos: bool,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(mut self, model_id: &str) -> Self {
        self.missing.insert(model_id.to_string());
        self
    }

    pub fn gated(mut self, model_id: &str, gate: Arc<Gate>) -> Self {
        self.gates.insert(model_id.to_string(), gate);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_bos(mut self) -> Self {
        self.bos = true;
        self
    }

    pub fn calls(&self, model_id: &str) -> usize {
        self.calls.lock().get(model_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl TokenizerLoader for CountingLoader {
    fn load(&self, model_id: &str) -> Result<Arc<dyn Tokenizer>, LoadError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .entry(model_id.to_string())
            .or_default() += 1;

        if let Some(gate) = self.gates.get(model_id) {
            gate.wait();
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if self.missing.contains(model_id) {
            return Err(LoadError::NotFound {
                model_id: model_id.to_string(),
                message: "404 Not Found".to_string(),
            });
        }

        Ok(Arc::new(WhitespaceTokenizer { bos: self.bos }))
    }
}
