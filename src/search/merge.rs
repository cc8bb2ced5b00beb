use std::collections::HashSet;

use crate::models::RetrievedPassage;

/// What makes two passages "the same" when merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupKey {
    /// Identical text is a duplicate regardless of source note.
    #[default]
    Content,
    /// Identical text only collides when the passage id matches too.
    IdAndContent,
}

impl DedupKey {
    fn key(&self, passage: &RetrievedPassage) -> String {
        match self {
            DedupKey::Content => passage.content.clone(),
            DedupKey::IdAndContent => format!("{}\u{0}{}", passage.metadata.id, passage.content),
        }
    }
}

/// Combines explicit and vector results into the final, budgeted list.
pub trait MergePolicy: Send + Sync {
    fn merge(
        &self,
        explicit: Vec<RetrievedPassage>,
        vector: Vec<RetrievedPassage>,
        max_k: usize,
    ) -> Vec<RetrievedPassage>;
}

/// Explicit mentions first in fetch order, then vector hits in rank order,
/// skipping duplicates, cut to `max_k`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitFirst {
    pub dedup: DedupKey,
}

impl MergePolicy for ExplicitFirst {
    fn merge(
        &self,
        explicit: Vec<RetrievedPassage>,
        vector: Vec<RetrievedPassage>,
        max_k: usize,
    ) -> Vec<RetrievedPassage> {
        let mut seen = HashSet::new();
        explicit
            .into_iter()
            .chain(vector)
            .filter(|p| seen.insert(self.dedup.key(p)))
            .take(max_k)
            .collect()
    }
}
