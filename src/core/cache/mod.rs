use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::core::tokenizer::Tokenizer;

/// A loaded tokenizer and its bookkeeping.
pub struct CacheEntry {
    pub tokenizer: Arc<dyn Tokenizer>,
    last_used: Mutex<Instant>,
}

impl CacheEntry {
    fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    pub fn last_used(&self) -> Instant {
        *self.last_used.lock()
    }
}

/// Model identifier to loaded tokenizer.
///
/// Unbounded unless constructed with a capacity, in which case inserting past
/// the bound evicts the least recently used entry. Entries never expire on
/// their own.
pub struct TokenizerCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    capacity: Option<usize>,
}

impl TokenizerCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: None,
        }
    }

    /// `0` means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: (capacity > 0).then_some(capacity),
        }
    }

    pub fn get(&self, model_id: &str) -> Option<Arc<dyn Tokenizer>> {
        let entries = self.entries.read();
        entries.get(model_id).map(|entry| {
            entry.touch();
            Arc::clone(&entry.tokenizer)
        })
    }

    pub fn put(&self, model_id: impl Into<String>, tokenizer: Arc<dyn Tokenizer>) {
        let model_id = model_id.into();
        let mut entries = self.entries.write();

        if let Some(capacity) = self.capacity {
            while !entries.contains_key(&model_id) && entries.len() >= capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used())
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        entries.remove(&id);
                        tracing::info!(model_id = %id, "Evicted least recently used tokenizer");
                    }
                    None => break,
                }
            }
        }

        entries.insert(model_id, CacheEntry::new(tokenizer));
    }

    /// Sorted snapshot of the cached identifiers.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.entries.read().contains_key(model_id)
    }

    /// Empties the cache under a single write lock, returning how many
    /// entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for TokenizerCache {
    fn default() -> Self {
        Self::new()
    }
}
