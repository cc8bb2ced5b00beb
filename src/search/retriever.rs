use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::llm::embeddings::Embedder;
use crate::llm::hyde::QueryRewriter;
use crate::models::RetrievedPassage;
use crate::search::explicit::fetch_explicit_chunks;
use crate::search::merge::{ExplicitFirst, MergePolicy};
use crate::search::title::extract_note_titles;
use crate::search::vector::PassageIndex;
use crate::vault::TitleResolver;

/// Fixed for the lifetime of a retriever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    /// Vector hits scoring below this are excluded.
    pub min_similarity_score: f32,
    /// Hard cap on the number of passages returned.
    pub max_k: usize,
    /// Log a structured trace of intermediate values.
    pub debug: bool,
}

impl RetrievalOptions {
    fn validate(&self) -> Result<()> {
        if self.max_k == 0 {
            return Err(RetrievalError::InvalidOptions(
                "max_k must be at least 1".to_string(),
            ));
        }
        if !self.min_similarity_score.is_finite() {
            return Err(RetrievalError::InvalidOptions(format!(
                "min_similarity_score must be finite, got {}",
                self.min_similarity_score
            )));
        }
        Ok(())
    }
}

impl From<&RetrievalConfig> for RetrievalOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            min_similarity_score: config.min_similarity_score,
            max_k: config.max_k,
            debug: config.debug,
        }
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrieveOptions {
    /// Embed the query verbatim; the language model is not called.
    pub bypass_rewrite: bool,
}

#[derive(Serialize)]
struct RetrievalTrace<'a> {
    titles: &'a [String],
    original_query: &'a str,
    rewritten_query: &'a str,
    explicit_chunks: &'a [RetrievedPassage],
    vector_chunks: &'a [RetrievedPassage],
    combined_chunks: &'a [RetrievedPassage],
}

/// Hybrid retrieval over a note vault:
///
/// 1. `[[Title]]` mentions are resolved and every passage of those notes is pulled in.
/// 2. Concurrently, the query is rewritten into a hypothetical passage (HyDE)
///    unless bypassed.
/// 3. The (rewritten) query is embedded and searched against the index.
/// 4. The merge policy combines both lists under the `max_k` budget.
///
/// Holds no mutable state; concurrent calls share the collaborators read-only.
/// Dropping the returned future abandons any in-flight collaborator calls.
pub struct HybridRetriever {
    resolver: Arc<dyn TitleResolver>,
    index: Arc<dyn PassageIndex>,
    embedder: Arc<dyn Embedder>,
    rewriter: QueryRewriter,
    merge_policy: Box<dyn MergePolicy>,
    options: RetrievalOptions,
}

impl HybridRetriever {
    pub fn new(
        resolver: Arc<dyn TitleResolver>,
        index: Arc<dyn PassageIndex>,
        embedder: Arc<dyn Embedder>,
        rewriter: QueryRewriter,
        options: RetrievalOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            resolver,
            index,
            embedder,
            rewriter,
            merge_policy: Box::new(ExplicitFirst::default()),
            options,
        })
    }

    pub fn with_merge_policy(mut self, policy: impl MergePolicy + 'static) -> Self {
        self.merge_policy = Box::new(policy);
        self
    }

    /// Retrieve at most `max_k` content-distinct passages for `query`.
    ///
    /// Fails only when the query cannot be embedded or the index search fails;
    /// a successful call may still return an empty list.
    pub async fn retrieve(
        &self,
        query: &str,
        opts: RetrieveOptions,
    ) -> Result<Vec<RetrievedPassage>> {
        let span = tracing::info_span!("retrieve", retrieval_id = %Uuid::new_v4());
        self.retrieve_inner(query, opts).instrument(span).await
    }

    async fn retrieve_inner(
        &self,
        query: &str,
        opts: RetrieveOptions,
    ) -> Result<Vec<RetrievedPassage>> {
        let titles = extract_note_titles(query);

        let explicit = fetch_explicit_chunks(self.resolver.as_ref(), self.index.as_ref(), &titles);
        let rewritten = async {
            if opts.bypass_rewrite {
                query.to_string()
            } else {
                self.rewriter.rewrite(query).await
            }
        };
        let (explicit, search_query) = tokio::join!(explicit, rewritten);

        let vector = self.vector_chunks(&search_query).await?;

        let traced = self
            .options
            .debug
            .then(|| (explicit.clone(), vector.clone()));
        let combined = self
            .merge_policy
            .merge(explicit, vector, self.options.max_k);

        if let Some((explicit, vector)) = traced {
            let trace = RetrievalTrace {
                titles: &titles,
                original_query: query,
                rewritten_query: &search_query,
                explicit_chunks: &explicit,
                vector_chunks: &vector,
                combined_chunks: &combined,
            };
            match serde_json::to_string(&trace) {
                Ok(json) => tracing::info!(trace = %json, "retrieval trace"),
                Err(e) => tracing::warn!("Failed to serialize retrieval trace: {e}"),
            }
        }

        tracing::debug!(
            "Retrieved {} passages ({} titles mentioned)",
            combined.len(),
            titles.len()
        );
        Ok(combined)
    }

    /// Embed `query` and return index hits at or above the similarity threshold,
    /// in the order the index ranked them.
    pub async fn vector_chunks(&self, query: &str) -> Result<Vec<RetrievedPassage>> {
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|source| RetrievalError::Embedding {
                query: query.to_string(),
                source,
            })?;

        if let Some(expected) = self.index.dimension() {
            if expected != vector.len() {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let min_score = self.options.min_similarity_score;
        let hits = self
            .index
            .vector_search(&vector, min_score, self.options.max_k)
            .await
            .map_err(|source| RetrievalError::Search { source })?;

        // The threshold and limit are re-applied: the index is trusted for ranking only
        Ok(hits
            .into_iter()
            .filter(|h| h.score.is_finite() && h.score >= min_score)
            .take(self.options.max_k)
            .map(|h| h.passage.into_retrieved(Some(h.score)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::ChatModel;
    use crate::models::{IndexedPassage, PassageMetadata, ScoredPassage};
    use async_trait::async_trait;
    use chrono::Utc;

    struct NoNotes;

    impl TitleResolver for NoNotes {
        fn resolve_title(&self, _: &str) -> Option<String> {
            None
        }
    }

    struct EmptyIndex;

    #[async_trait]
    impl PassageIndex for EmptyIndex {
        async fn fetch_by_path(&self, _: &str) -> anyhow::Result<Vec<IndexedPassage>> {
            Ok(Vec::new())
        }

        async fn vector_search(
            &self,
            _: &[f32],
            _: f32,
            _: usize,
        ) -> anyhow::Result<Vec<ScoredPassage>> {
            Ok(Vec::new())
        }

        fn dimension(&self) -> Option<usize> {
            Some(2)
        }
    }

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_query(&self, _: &str) -> anyhow::Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct SilentModel;

    #[async_trait]
    impl ChatModel for SilentModel {
        async fn invoke(&self, _: &str) -> anyhow::Result<String> {
            anyhow::bail!("offline")
        }
    }

    fn options(max_k: usize) -> RetrievalOptions {
        RetrievalOptions {
            min_similarity_score: 0.5,
            max_k,
            debug: false,
        }
    }

    fn build(embedding: Vec<f32>, opts: RetrievalOptions) -> Result<HybridRetriever> {
        HybridRetriever::new(
            Arc::new(NoNotes),
            Arc::new(EmptyIndex),
            Arc::new(FixedEmbedder(embedding)),
            QueryRewriter::new(Arc::new(SilentModel), None),
            opts,
        )
    }

    #[test]
    fn test_zero_max_k_rejected() {
        let err = build(vec![1.0, 0.0], options(0)).err().unwrap();
        assert!(matches!(err, RetrievalError::InvalidOptions(_)));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let opts = RetrievalOptions {
            min_similarity_score: f32::NAN,
            ..options(3)
        };
        assert!(build(vec![1.0, 0.0], opts).is_err());
    }

    #[test]
    fn test_options_from_config() {
        let config = RetrievalConfig {
            min_similarity_score: 0.7,
            max_k: 4,
            debug: true,
            rewrite_timeout_secs: 0,
        };
        let opts = RetrievalOptions::from(&config);
        assert_eq!(opts.max_k, 4);
        assert!(opts.debug);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let retriever = build(vec![1.0, 0.0, 0.0], options(3)).unwrap();
        let err = retriever
            .retrieve("anything", RetrieveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_nothing_found_is_empty_not_error() {
        let retriever = build(vec![1.0, 0.0], options(3)).unwrap();
        let result = retriever
            .retrieve("[[Missing]] hello", RetrieveOptions::default())
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_trace_serializes_all_stages() {
        let passage = RetrievedPassage {
            content: "c".to_string(),
            metadata: PassageMetadata {
                id: "p".to_string(),
                path: "p.md".to_string(),
                title: "p".to_string(),
                embedding_model: "m".to_string(),
                tags: vec![],
                extension: "md".to_string(),
                created_at: Utc::now(),
                character_count: 1,
                mtime: Utc::now(),
                ctime: Utc::now(),
            },
            score: Some(0.9),
        };
        let titles = vec!["p".to_string()];
        let passages = vec![passage];
        let trace = RetrievalTrace {
            titles: &titles,
            original_query: "q",
            rewritten_query: "rq",
            explicit_chunks: &[],
            vector_chunks: &passages,
            combined_chunks: &passages,
        };
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["rewritten_query"], "rq");
        assert_eq!(json["vector_chunks"][0]["id"], "p");
        assert!(json["explicit_chunks"].as_array().unwrap().is_empty());
    }
}
