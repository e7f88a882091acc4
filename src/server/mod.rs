use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::api::types::{
    CacheResponse, ClearCacheResponse, ErrorResponse, HealthResponse, TokenizeRequest,
    TokenizeResponse,
};
use crate::core::{HubLoader, LoadCoordinator, ServiceError, TokenizeService, TokenizerCache, TokenizerLoader};
use crate::envconfig::EnvConfig;

#[derive(Clone)]
pub struct AppState {
    pub service: TokenizeService,
}

pub fn router(service: TokenizeService) -> Router {
    Router::new()
        .route("/tokenize", post(tokenize))
        .route("/health", get(health))
        .route("/cache", get(cache_info).delete(clear_cache))
        .layer(axum::middleware::from_fn(crate::middleware::log_requests))
        .with_state(AppState { service })
}

/// Wires the cache, coordinator and service from configuration.
pub fn build_service(config: &EnvConfig, loader: Arc<dyn TokenizerLoader>) -> TokenizeService {
    let cache = Arc::new(match config.max_cached {
        Some(capacity) => TokenizerCache::with_capacity(capacity),
        None => TokenizerCache::new(),
    });
    let coordinator = LoadCoordinator::new(cache, loader).with_timeout(config.load_timeout);
    TokenizeService::new(coordinator).normalize_ids(config.normalize_ids)
}

pub async fn serve(config: EnvConfig) -> Result<()> {
    let service = build_service(&config, Arc::new(HubLoader::from_env().allow_local(config.allow_local)));

    if !config.preload.is_empty() {
        let loaded = service.coordinator().preload(&config.preload).await;
        tracing::info!("Preloaded {}/{} tokenizers", loaded, config.preload.len());
    }

    let app = router(service);
    let addr = config.host.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Tokenizer service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Tokenizer service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if !self.is_client_error() {
            tracing::error!(error = %self, details = ?self.details(), "Tokenize request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

async fn tokenize(
    AxumState(state): AxumState<AppState>,
    payload: Result<Json<TokenizeRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let body = ErrorResponse {
                error: "Invalid request body".to_string(),
                details: Some(rejection.body_text()),
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    match state.service.tokenize(&req.text, &req.model_id).await {
        Ok(out) => Json(TokenizeResponse {
            success: true,
            token_count: out.token_count,
            tokens: out.tokens,
            token_ids: out.token_ids,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn health(AxumState(state): AxumState<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        cache_size: state.service.cache_size(),
    })
}

async fn cache_info(AxumState(state): AxumState<AppState>) -> impl IntoResponse {
    let cached_models = state.service.cached_models();
    Json(CacheResponse {
        cache_size: cached_models.len(),
        cached_models,
    })
}

async fn clear_cache(AxumState(state): AxumState<AppState>) -> impl IntoResponse {
    let cleared = state.service.clear_cache();
    Json(ClearCacheResponse {
        message: format!("Cleared {} tokenizers from cache", cleared),
        cleared,
    })
}
