use anyhow::{Context, Result};
use tokserve::api::Client;
use tokserve::envconfig::EnvConfig;

pub async fn serve(config: EnvConfig) -> Result<()> {
    tokserve::server::serve(config).await
}

pub async fn tokenize(model: &str, text: &str, json: bool) -> Result<()> {
    let client = Client::from_env();
    let started = std::time::Instant::now();
    let result = client
        .tokenize(text, model)
        .await
        .with_context(|| format!("Failed to tokenize with {}", model))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Model:       {}", model);
    println!("Token count: {}", result.token_count);
    println!("Tokens:      {:?}", result.tokens);
    println!("Token IDs:   {:?}", result.token_ids);
    println!("Time:        {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}

pub async fn health() -> Result<()> {
    let client = Client::from_env();
    let health = client
        .health()
        .await
        .with_context(|| format!("Could not reach {}", client.base_url()))?;
    println!("{} (cached tokenizers: {})", health.status, health.cache_size);
    Ok(())
}

pub async fn cache() -> Result<()> {
    let info = Client::from_env().cache().await?;

    if info.cached_models.is_empty() {
        println!("No tokenizers cached");
        return Ok(());
    }

    println!("MODEL");
    println!("{}", "-".repeat(60));
    for model in &info.cached_models {
        println!("{}", model);
    }
    println!("\n{} cached", info.cache_size);
    Ok(())
}

pub async fn clear_cache() -> Result<()> {
    let resp = Client::from_env().clear_cache().await?;
    println!("{}", resp.message);
    Ok(())
}

pub fn version() -> Result<()> {
    println!("tokserve version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
