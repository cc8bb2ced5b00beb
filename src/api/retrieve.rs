use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::error::RetrievalError;
use crate::models::{RetrieveRequest, RetrieveResponse};
use crate::search::retriever::RetrieveOptions;
use crate::state::AppState;

const MAX_QUERY_LEN: usize = 4000;

/// POST /api/retrieve - Hybrid retrieval:
///   1. `[[Title]]` mentions pull in every passage of the named notes
///   2. HyDE rewrite (unless `bypass_rewrite`) + vector search
///   3. Explicit-first merge, deduplicated by content, capped at max_k
pub async fn retrieve(
    State(state): State<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, (StatusCode, String)> {
    validate_query(&req.query)?;

    let opts = RetrieveOptions {
        bypass_rewrite: req.bypass_rewrite,
    };

    let passages = state
        .retriever
        .retrieve(&req.query, opts)
        .await
        .map_err(failure)?;

    Ok(Json(RetrieveResponse {
        query: req.query,
        passages,
    }))
}

/// Whitespace only decides emptiness; the query itself is passed through untouched.
fn validate_query(query: &str) -> Result<(), (StatusCode, String)> {
    if query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    if query.len() > MAX_QUERY_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Query exceeds {MAX_QUERY_LEN} bytes"),
        ));
    }
    Ok(())
}

fn failure(err: RetrievalError) -> (StatusCode, String) {
    let status = status_for(&err);
    let message = format!("{:#}", anyhow::Error::new(err));
    tracing::error!("Retrieval failed: {message}");
    (status, message)
}

fn status_for(err: &RetrievalError) -> StatusCode {
    match err {
        RetrievalError::Embedding { .. } | RetrievalError::Search { .. } => StatusCode::BAD_GATEWAY,
        RetrievalError::InvalidOptions(_) | RetrievalError::DimensionMismatch { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_failures_map_to_bad_gateway() {
        let err = RetrievalError::Embedding {
            query: "q".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);

        let err = RetrievalError::Search {
            source: anyhow::anyhow!("index offline"),
        };
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_dimension_mismatch_is_internal() {
        let err = RetrievalError::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_names_query_and_cause_once() {
        let err = RetrievalError::Embedding {
            query: "what about [[Plan]]?".to_string(),
            source: anyhow::anyhow!("model unreachable"),
        };
        assert!(!err.to_string().contains("model unreachable"));

        let (status, body) = failure(err);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("what about [[Plan]]?"));
        assert_eq!(body.matches("model unreachable").count(), 1);
    }

    #[test]
    fn test_query_whitespace_is_not_stripped() {
        assert!(validate_query("  [[Plan]] deadlines \n").is_ok());
        assert_eq!(validate_query(" \t\n").unwrap_err().0, StatusCode::BAD_REQUEST);
        assert!(validate_query(&"x".repeat(MAX_QUERY_LEN + 1)).is_err());
    }
}
