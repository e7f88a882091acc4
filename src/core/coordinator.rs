use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::core::cache::TokenizerCache;
use crate::core::error::LoadError;
use crate::core::loader::TokenizerLoader;
use crate::core::tokenizer::Tokenizer;

pub type LoadOutcome = Result<Arc<dyn Tokenizer>, LoadError>;

type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// Deduplicates concurrent loads of the same model identifier.
///
/// The first caller to miss the cache starts a detached load task and
/// publishes a shared handle to it; later callers for the same identifier
/// await that handle instead of loading again. The task itself stores a
/// successful result in the cache and removes the handle, both under the
/// in-flight lock, so an acquirer always observes either the handle or the
/// cache entry. Dropping a waiting caller never cancels the load.
///
/// The timeout bounds how long each caller waits, not the load itself. A
/// load that overruns keeps its handle until the blocking call returns, so
/// retries for that identifier wait on it rather than occupying another
/// blocking thread.
#[derive(Clone)]
pub struct LoadCoordinator {
    cache: Arc<TokenizerCache>,
    loader: Arc<dyn TokenizerLoader>,
    in_flight: Arc<Mutex<HashMap<String, SharedLoad>>>,
    timeout: Option<Duration>,
}

impl LoadCoordinator {
    pub fn new(cache: Arc<TokenizerCache>, loader: Arc<dyn TokenizerLoader>) -> Self {
        Self {
            cache,
            loader,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            timeout: None,
        }
    }

    /// Bounds how long a caller waits on a load; an overrun fails that caller
    /// with `LoadError::Timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn cache(&self) -> &Arc<TokenizerCache> {
        &self.cache
    }

    pub async fn acquire(&self, model_id: &str) -> LoadOutcome {
        if let Some(tokenizer) = self.cache.get(model_id) {
            tracing::debug!(model_id, "Using cached tokenizer");
            return Ok(tokenizer);
        }

        let load = {
            let mut in_flight = self.in_flight.lock();

            // A load may have finished between the lookup above and taking
            // the lock.
            if let Some(tokenizer) = self.cache.get(model_id) {
                return Ok(tokenizer);
            }

            match in_flight.get(model_id) {
                Some(load) => {
                    tracing::debug!(model_id, "Waiting on in-flight tokenizer load");
                    load.clone()
                }
                None => {
                    let load = self.start_load(model_id);
                    in_flight.insert(model_id.to_string(), load.clone());
                    load
                }
            }
        };

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, load).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        model_id,
                        timeout_ms = limit.as_millis() as u64,
                        "Gave up waiting on tokenizer load"
                    );
                    Err(LoadError::Timeout {
                        model_id: model_id.to_string(),
                        millis: limit.as_millis() as u64,
                    })
                }
            },
            None => load.await,
        }
    }

    /// Identifiers with a load currently underway.
    pub fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.in_flight.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Loads every identifier concurrently, logging failures. Returns how many
    /// ended up available.
    pub async fn preload(&self, model_ids: &[String]) -> usize {
        let outcomes = futures::future::join_all(model_ids.iter().map(|id| self.acquire(id))).await;

        let mut loaded = 0;
        for (model_id, outcome) in model_ids.iter().zip(outcomes) {
            match outcome {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(model_id = %model_id, error = %e, "Preload failed"),
            }
        }
        loaded
    }

    // Caller holds the in-flight lock; the spawned task cannot finish before
    // the returned handle is registered.
    fn start_load(&self, model_id: &str) -> SharedLoad {
        let id = model_id.to_string();
        let loader = Arc::clone(&self.loader);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            tracing::info!(model_id = %id, "Loading tokenizer");
            let started = Instant::now();

            let outcome = run_load(loader, id.clone()).await;

            {
                let mut in_flight = in_flight.lock();
                if let Ok(tokenizer) = &outcome {
                    cache.put(id.clone(), Arc::clone(tokenizer));
                }
                in_flight.remove(&id);
            }

            match &outcome {
                Ok(_) => tracing::info!(
                    model_id = %id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Successfully loaded and cached tokenizer"
                ),
                Err(e) => tracing::error!(model_id = %id, error = %e, "Failed to load tokenizer"),
            }

            outcome
        });

        let id = model_id.to_string();
        async move {
            task.await.unwrap_or_else(|e| {
                Err(LoadError::Worker {
                    model_id: id,
                    message: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}

// Runs until the loader returns; the handle stays registered until then.
async fn run_load(loader: Arc<dyn TokenizerLoader>, model_id: String) -> LoadOutcome {
    let id = model_id.clone();
    tokio::task::spawn_blocking(move || loader.load(&id))
        .await
        .unwrap_or_else(|e| {
            Err(LoadError::Worker {
                model_id,
                message: e.to_string(),
            })
        })
}
