use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the note vault
    pub vault_dir: PathBuf,
    /// Where the passage index is persisted
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Retrieval tuning
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for HyDE rewriting
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

/// Knobs for the hybrid retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Vector hits scoring below this are dropped.
    pub min_similarity_score: f32,
    /// Hard cap on passages returned per call.
    pub max_k: usize,
    /// Emit a structured trace of every retrieval.
    pub debug: bool,
    /// Deadline for the HyDE rewrite in seconds (0 = no deadline, capped at 120).
    pub rewrite_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_dir: PathBuf::from("./vault"),
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9100".to_string(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_similarity_score: 0.3,
            max_k: 10,
            debug: false,
            rewrite_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("NOTES_RETRIEVAL_VAULT_DIR") {
            config.vault_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("NOTES_RETRIEVAL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("NOTES_RETRIEVAL_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Some(model) = lookup("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(dim) = lookup("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }

        // Retrieval config
        if let Some(val) = lookup("RETRIEVAL_MIN_SIMILARITY") {
            if let Ok(v) = val.parse::<f32>() {
                config.retrieval.min_similarity_score = v;
            }
        }
        if let Some(val) = lookup("RETRIEVAL_MAX_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.max_k = v;
            }
        }
        if let Some(val) = lookup("RETRIEVAL_DEBUG") {
            config.retrieval.debug = matches!(val.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(val) = lookup("RETRIEVAL_REWRITE_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.retrieval.rewrite_timeout_secs = v.min(120); // Cap at 120s
            }
        }

        config
    }

    pub fn passages_path(&self) -> PathBuf {
        self.data_dir.join("passages.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.retrieval.max_k, 10);
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.passages_path(), PathBuf::from("./data/passages.json"));
    }

    #[test]
    fn test_overrides_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("NOTES_RETRIEVAL_VAULT_DIR", "/notes"),
            ("RETRIEVAL_MIN_SIMILARITY", "0.8"),
            ("RETRIEVAL_MAX_K", "5"),
            ("RETRIEVAL_DEBUG", "true"),
            ("LLM_PROVIDER", "openai"),
        ]));
        assert_eq!(config.vault_dir, PathBuf::from("/notes"));
        assert!((config.retrieval.min_similarity_score - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.max_k, 5);
        assert!(config.retrieval.debug);
        assert_eq!(config.llm.provider, "openai");
    }

    #[test]
    fn test_unparseable_values_keep_default() {
        let config = Config::from_lookup(lookup_from(&[
            ("RETRIEVAL_MAX_K", "lots"),
            ("LLM_EMBEDDING_DIM", "-3"),
        ]));
        assert_eq!(config.retrieval.max_k, 10);
        assert_eq!(config.llm.embedding_dim, 768);
    }

    #[test]
    fn test_rewrite_timeout_capped() {
        let config =
            Config::from_lookup(lookup_from(&[("RETRIEVAL_REWRITE_TIMEOUT_SECS", "9999")]));
        assert_eq!(config.retrieval.rewrite_timeout_secs, 120);
    }
}
