use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document-level metadata carried by every passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Stable identifier, unique within the index
    pub id: String,
    /// Vault-relative path of the owning note
    pub path: String,
    pub title: String,
    /// Name of the model that produced the embedding
    pub embedding_model: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
    pub created_at: DateTime<Utc>,
    pub character_count: usize,
    /// Note modification time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub mtime: DateTime<Utc>,
    /// Note creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ctime: DateTime<Utc>,
}

fn default_extension() -> String {
    "md".to_string()
}

/// A single passage as stored in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPassage {
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(flatten)]
    pub metadata: PassageMetadata,
}

impl IndexedPassage {
    /// Project into a retrieval result, dropping the embedding.
    pub fn into_retrieved(self, score: Option<f32>) -> RetrievedPassage {
        RetrievedPassage {
            content: self.content,
            metadata: self.metadata,
            score,
        }
    }
}

/// A vector-search hit: a passage paired with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub passage: IndexedPassage,
    pub score: f32,
}

/// A passage returned by one retrieval call.
///
/// `score` is `None` for explicit mentions, which are never scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub content: String,
    #[serde(flatten)]
    pub metadata: PassageMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Retrieve request
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    /// Skip HyDE rewriting and embed the query verbatim
    #[serde(default)]
    pub bypass_rewrite: bool,
}

/// Retrieve response
#[derive(Debug, Clone, Serialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub passages: Vec<RetrievedPassage>,
}

/// Index statistics response
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub passages: usize,
    pub documents: usize,
    pub dimension: Option<usize>,
    pub vault_notes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> IndexedPassage {
        IndexedPassage {
            content: "Deadlines slip when scope grows.".to_string(),
            embedding: vec![0.1, 0.2],
            metadata: PassageMetadata {
                id: "plan-0".to_string(),
                path: "Projects/Project Plan.md".to_string(),
                title: "Project Plan".to_string(),
                embedding_model: "nomic-embed-text".to_string(),
                tags: vec!["#work".to_string()],
                extension: "md".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                character_count: 32,
                mtime: Utc.timestamp_millis_opt(1_709_294_400_000).unwrap(),
                ctime: Utc.timestamp_millis_opt(1_709_294_400_000).unwrap(),
            },
        }
    }

    #[test]
    fn test_into_retrieved_drops_embedding_keeps_metadata() {
        let passage = sample();
        let retrieved = passage.clone().into_retrieved(Some(0.9));
        assert_eq!(retrieved.content, passage.content);
        assert_eq!(retrieved.metadata, passage.metadata);
        assert_eq!(retrieved.score, Some(0.9));
    }

    #[test]
    fn test_explicit_passage_serializes_without_score() {
        let json = serde_json::to_value(sample().into_retrieved(None)).unwrap();
        assert!(json.get("score").is_none());
        assert!(json.get("embedding").is_none());
        assert_eq!(json["path"], "Projects/Project Plan.md");
        assert_eq!(json["mtime"], 1_709_294_400_000i64);
    }

    #[test]
    fn test_indexed_passage_reads_flat_json() {
        let json = serde_json::json!({
            "content": "hello",
            "embedding": [1.0, 0.0],
            "id": "a",
            "path": "a.md",
            "title": "a",
            "embedding_model": "m",
            "created_at": "2024-03-01T12:00:00Z",
            "character_count": 5,
            "mtime": 0,
            "ctime": 0
        });
        let passage: IndexedPassage = serde_json::from_value(json).unwrap();
        assert_eq!(passage.metadata.extension, "md");
        assert!(passage.metadata.tags.is_empty());
    }
}
