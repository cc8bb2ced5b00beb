use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::models::{IndexedPassage, ScoredPassage};

/// Read side of the passage index consumed by the retriever.
#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Every passage owned by `path`, in index order. Unscored.
    async fn fetch_by_path(&self, path: &str) -> Result<Vec<IndexedPassage>>;

    /// Passages scoring at least `min_score` against `vector`, best first, at most `limit`.
    async fn vector_search(
        &self,
        vector: &[f32],
        min_score: f32,
        limit: usize,
    ) -> Result<Vec<ScoredPassage>>;

    /// Embedding dimension, or `None` while the index is empty.
    fn dimension(&self) -> Option<usize>;
}

/// In-memory passage store with disk persistence and cosine similarity search.
pub struct VectorStore {
    entries: RwLock<Vec<IndexedPassage>>,
    persist_path: PathBuf,
}

impl VectorStore {
    /// Open the store persisted at `persist_path`, or start empty if the file is absent.
    ///
    /// The file is validated once here; a store that loads is internally consistent.
    pub fn open_or_create(persist_path: &Path) -> Result<Self> {
        if let Some(parent) = persist_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if persist_path.exists() {
            let data = std::fs::read_to_string(persist_path)
                .context("Failed to read passage index")?;
            let entries: Vec<IndexedPassage> = serde_json::from_str(&data).with_context(|| {
                format!("Malformed passage index {}", persist_path.display())
            })?;
            validate(&[], &entries)?;
            entries
        } else {
            Vec::new()
        };

        tracing::info!(
            "Loaded {} passages from {}",
            entries.len(),
            persist_path.display()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path: persist_path.to_path_buf(),
        })
    }

    /// Add passages. Rejects the whole batch if any id collides or a dimension disagrees.
    pub fn add_passages(&self, passages: Vec<IndexedPassage>) -> Result<()> {
        let mut entries = self.entries.write();
        validate(&entries, &passages)?;
        let mut updated = entries.clone();
        updated.extend(passages);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    /// Delete all passages owned by a note.
    pub fn delete_path(&self, path: &str) -> Result<usize> {
        let mut entries = self.entries.write();
        let updated: Vec<IndexedPassage> = entries
            .iter()
            .filter(|e| e.metadata.path != path)
            .cloned()
            .collect();
        let removed = entries.len() - updated.len();
        self.persist(&updated)?;
        *entries = updated;
        Ok(removed)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Get passage counts grouped by note path.
    pub fn path_counts(&self) -> HashMap<String, usize> {
        let entries = self.entries.read();
        let mut counts = HashMap::new();
        for e in entries.iter() {
            *counts.entry(e.metadata.path.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Atomic write via temp file + rename. Memory is only updated after this succeeds.
    fn persist(&self, entries: &[IndexedPassage]) -> Result<()> {
        let data = serde_json::to_string(entries)?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data).context("Failed to write passage index")?;
        std::fs::rename(&tmp_path, &self.persist_path)
            .context("Failed to replace passage index")?;
        Ok(())
    }
}

#[async_trait]
impl PassageIndex for VectorStore {
    async fn fetch_by_path(&self, path: &str) -> Result<Vec<IndexedPassage>> {
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .filter(|e| e.metadata.path == path)
            .cloned()
            .collect())
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        min_score: f32,
        limit: usize,
    ) -> Result<Vec<ScoredPassage>> {
        let entries = self.entries.read();
        if let Some(first) = entries.first() {
            if first.embedding.len() != vector.len() {
                anyhow::bail!(
                    "Query vector has {} dimensions, index has {}",
                    vector.len(),
                    first.embedding.len()
                );
            }
        }

        let mut scored: Vec<(f32, &IndexedPassage)> = entries
            .iter()
            .map(|e| (cosine_similarity(vector, &e.embedding), e))
            .filter(|(score, _)| *score >= min_score)
            .collect();

        // Sort descending by score; stable so ties keep index order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, e)| ScoredPassage {
                passage: e.clone(),
                score,
            })
            .collect())
    }

    fn dimension(&self) -> Option<usize> {
        self.entries.read().first().map(|e| e.embedding.len())
    }
}

/// Check `incoming` against itself and the passages already stored.
fn validate(existing: &[IndexedPassage], incoming: &[IndexedPassage]) -> Result<()> {
    let mut dimension = existing.first().map(|e| e.embedding.len());
    let mut ids: HashSet<&str> = existing.iter().map(|e| e.metadata.id.as_str()).collect();

    for passage in incoming {
        let id = passage.metadata.id.as_str();
        if passage.embedding.is_empty() {
            anyhow::bail!("Passage {id} has an empty embedding");
        }
        if passage.embedding.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("Passage {id} has a non-finite embedding value");
        }
        match dimension {
            Some(d) if d != passage.embedding.len() => anyhow::bail!(
                "Passage {id} has {} dimensions, index has {d}",
                passage.embedding.len()
            ),
            Some(_) => {}
            None => dimension = Some(passage.embedding.len()),
        }
        if !ids.insert(id) {
            anyhow::bail!("Duplicate passage id {id}");
        }
    }

    Ok(())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
