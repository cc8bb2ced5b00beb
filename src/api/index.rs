use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::IndexStats;
use crate::search::vector::PassageIndex;
use crate::state::AppState;

/// GET /api/index/stats
pub async fn stats(State(state): State<AppState>) -> Json<IndexStats> {
    Json(IndexStats {
        passages: state.passages.entry_count(),
        documents: state.passages.path_counts().len(),
        dimension: state.passages.dimension(),
        vault_notes: state.vault.note_count(),
    })
}

/// POST /api/vault/refresh - Rescan the vault so new notes resolve by title.
pub async fn refresh_vault(
    State(state): State<AppState>,
) -> Result<Json<IndexStats>, (StatusCode, String)> {
    let vault = state.vault.clone();
    tokio::task::spawn_blocking(move || vault.refresh())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Vault refresh error: {e}"),
            )
        })?
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Vault refresh error: {e:#}"),
            )
        })?;

    Ok(stats(State(state)).await)
}
