mod test_http {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use tokserve::core::testing::{CountingLoader, Gate};
    use tokserve::envconfig::EnvConfig;
    use tokserve::server::{build_service, router};

    fn app(loader: Arc<CountingLoader>) -> Router {
        router(build_service(&EnvConfig::default(), loader))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_tokenize_then_cached() {
        let loader = Arc::new(CountingLoader::new());
        let app = app(loader.clone());

        let (status, body) = call(
            &app,
            Method::POST,
            "/tokenize",
            Some(json!({"text": "Hello, how are you today?", "modelId": "bert-base-uncased"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["tokenCount"], 5);
        assert_eq!(body["tokenIds"].as_array().unwrap().len(), 5);
        assert_eq!(body["tokens"][0], "Hello,");

        let (status, _) = call(
            &app,
            Method::POST,
            "/tokenize",
            Some(json!({"text": "This is a second test.", "modelId": "bert-base-uncased"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loader.calls("bert-base-uncased"), 1);

        let (_, body) = call(&app, Method::GET, "/cache", None).await;
        assert_eq!(body, json!({"cached_models": ["bert-base-uncased"], "cache_size": 1}));

        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "cache_size": 1}));
    }

    #[tokio::test]
    async fn test_hub_path_alias() {
        let loader = Arc::new(CountingLoader::new());
        let app = app(loader.clone());

        let (status, body) = call(
            &app,
            Method::POST,
            "/tokenize",
            Some(json!({"text": "Testing different tokenizer models.", "hubPath": "gpt2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tokenCount"], 4);
        assert_eq!(loader.calls("gpt2"), 1);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let loader = Arc::new(CountingLoader::new());
        let app = app(loader.clone());

        for payload in [
            json!({"text": "", "modelId": "bert-base-uncased"}),
            json!({"text": "Hello", "modelId": ""}),
            json!({"text": "Hello"}),
        ] {
            let (status, body) = call(&app, Method::POST, "/tokenize", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Missing text or modelId parameter");
        }

        assert_eq!(loader.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = app(Arc::new(CountingLoader::new()));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/tokenize")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Invalid request body");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let loader = Arc::new(CountingLoader::new().missing("nonexistent-model-xyz"));
        let app = app(loader.clone());

        let (status, body) = call(
            &app,
            Method::POST,
            "/tokenize",
            Some(json!({"text": "Hello", "modelId": "nonexistent-model-xyz"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to load nonexistent-model-xyz");
        assert!(body["details"].as_str().unwrap().contains("nonexistent-model-xyz"));

        let (_, body) = call(&app, Method::GET, "/cache", None).await;
        assert_eq!(body, json!({"cached_models": [], "cache_size": 0}));
    }

    #[tokio::test]
    async fn test_tokenize_failure_is_server_error() {
        let app = app(Arc::new(CountingLoader::new()));

        let (status, body) = call(
            &app,
            Method::POST,
            "/tokenize",
            Some(json!({"text": "nul\u{0}byte", "modelId": "gpt2"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Tokenization failed for gpt2");
        assert_eq!(body["details"], "NUL byte in input");

        let (_, body) = call(&app, Method::GET, "/cache", None).await;
        assert_eq!(body["cached_models"], json!(["gpt2"]));
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let app = app(Arc::new(CountingLoader::new()));

        for model in ["gpt2", "distilbert-base-uncased"] {
            let (status, _) = call(
                &app,
                Method::POST,
                "/tokenize",
                Some(json!({"text": "Hello", "modelId": model})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = call(&app, Method::DELETE, "/cache", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Cleared 2 tokenizers from cache", "cleared": 2}));

        let (_, body) = call(&app, Method::GET, "/cache", None).await;
        assert_eq!(body, json!({"cached_models": [], "cache_size": 0}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_clear_during_load() {
        let gate = Arc::new(Gate::default());
        let loader = Arc::new(CountingLoader::new().gated("gpt2", gate.clone()));
        let app = app(loader.clone());

        let pending = {
            let app = app.clone();
            tokio::spawn(async move {
                call(&app, Method::POST, "/tokenize", Some(json!({"text": "Hello", "modelId": "gpt2"}))).await
            })
        };

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while loader.calls("gpt2") == 0 {
            assert!(std::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let (_, body) = call(&app, Method::DELETE, "/cache", None).await;
        assert_eq!(body["cleared"], 0);
        let (_, body) = call(&app, Method::GET, "/cache", None).await;
        assert_eq!(body, json!({"cached_models": [], "cache_size": 0}));

        gate.open();
        let (status, _) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_single_load() {
        let loader = Arc::new(CountingLoader::new().delay(Duration::from_millis(100)));
        let app = app(loader.clone());

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    call(
                        &app,
                        Method::POST,
                        "/tokenize",
                        Some(json!({"text": format!("request number {}", i), "modelId": "gpt2"})),
                    )
                    .await
                })
            })
            .collect();

        for handle in handles {
            let (status, body) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["tokenCount"], body["tokenIds"].as_array().unwrap().len());
        }
        assert_eq!(loader.calls("gpt2"), 1);
    }
}

mod test_loader {
    use tokserve::core::loader::{HubLoader, TokenizerLoader};
    use tokserve::LoadError;

    #[test]
    fn test_missing_local_directory_is_not_found() {
        let dir = std::env::temp_dir().join(format!("tokserve-missing-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let err = HubLoader::new().allow_local(true).load(dir.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, LoadError::NotFound { .. }));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
