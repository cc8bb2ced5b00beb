use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use notes_retrieval::api;
use notes_retrieval::config::Config;
use notes_retrieval::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Vault directory: {}", config.vault_dir.display());
    tracing::info!("Passage index: {}", config.passages_path().display());
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!(
        "Retrieval: min_similarity={} max_k={} debug={}",
        config.retrieval.min_similarity_score,
        config.retrieval.max_k,
        config.retrieval.debug
    );

    let state = AppState::new(&config)?;

    let app = Router::new()
        .route("/api/retrieve", post(api::retrieve::retrieve))
        .route("/api/index/stats", get(api::index::stats))
        .route("/api/vault/refresh", post(api::index::refresh_vault))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
