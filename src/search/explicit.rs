use futures_util::future::join_all;

use crate::models::RetrievedPassage;
use crate::search::vector::PassageIndex;
use crate::vault::TitleResolver;

/// Fetch every indexed passage of each note named in `titles`.
///
/// Lookups run concurrently but results are concatenated in title order.
/// A title that does not resolve, or whose lookup fails, contributes nothing.
/// Passages carry no score: explicit mentions are included unconditionally.
pub async fn fetch_explicit_chunks(
    resolver: &dyn TitleResolver,
    index: &dyn PassageIndex,
    titles: &[String],
) -> Vec<RetrievedPassage> {
    let lookups = titles.iter().map(|title| async move {
        let Some(path) = resolver.resolve_title(title) else {
            tracing::debug!("No note matches [[{title}]]");
            return Vec::new();
        };

        match index.fetch_by_path(&path).await {
            Ok(passages) => {
                tracing::debug!("[[{title}]] -> {path}: {} passages", passages.len());
                passages
                    .into_iter()
                    .map(|p| p.into_retrieved(None))
                    .collect()
            }
            Err(e) => {
                tracing::warn!("Failed to fetch passages for [[{title}]] ({path}): {e:#}");
                Vec::new()
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}
