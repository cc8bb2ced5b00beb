use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::chat::HttpChatModel;
use crate::llm::embeddings::HttpEmbedder;
use crate::llm::hyde::QueryRewriter;
use crate::search::retriever::{HybridRetriever, RetrievalOptions};
use crate::search::vector::VectorStore;
use crate::vault::Vault;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
    pub passages: Arc<VectorStore>,
    pub retriever: Arc<HybridRetriever>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let vault = Arc::new(Vault::open(&config.vault_dir)?);
        let passages = Arc::new(VectorStore::open_or_create(&config.passages_path())?);

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let rewrite_timeout = match config.retrieval.rewrite_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let rewriter = QueryRewriter::new(
            Arc::new(HttpChatModel::new(http_client.clone(), config.llm.clone())),
            rewrite_timeout,
        );
        let embedder = Arc::new(HttpEmbedder::new(http_client, config.llm.clone()));

        let retriever = HybridRetriever::new(
            vault.clone(),
            passages.clone(),
            embedder,
            rewriter,
            RetrievalOptions::from(&config.retrieval),
        )?;

        Ok(Self {
            vault,
            passages,
            retriever: Arc::new(retriever),
        })
    }
}
