//! Hypothetical document rewriting (HyDE).
//!
//! The query is replaced by a passage the model imagines would answer it, so
//! the query embedding lands closer to real passage embeddings. Any failure
//! falls back to the original query.

use anyhow::Result;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::llm::chat::ChatModel;

static CONTROL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\|[A-Za-z0-9_]{1,32}\|>").expect("control token pattern is valid")
});

/// Strip chat-template control tokens (`<|im_start|>` and friends).
pub fn sanitize_for_prompt(text: &str) -> String {
    CONTROL_TOKEN.replace_all(text, "").into_owned()
}

pub fn build_hyde_prompt(query: &str) -> String {
    format!(
        "Please write a passage to answer the question. If you don't know the answer, \
         just make up a passage that plausibly would.\n\
         Question: {}\n\
         Passage:",
        sanitize_for_prompt(query)
    )
}

pub struct QueryRewriter {
    model: Arc<dyn ChatModel>,
    timeout: Option<Duration>,
}

impl QueryRewriter {
    /// `timeout` of `None` waits for the model indefinitely.
    pub fn new(model: Arc<dyn ChatModel>, timeout: Option<Duration>) -> Self {
        Self { model, timeout }
    }

    /// The hypothetical passage for `query`, or `query` itself if generation fails.
    pub async fn rewrite(&self, query: &str) -> String {
        match self.generate(query).await {
            Ok(passage) => passage,
            Err(e) => {
                tracing::warn!("HyDE rewrite failed, using original query: {e:#}");
                query.to_string()
            }
        }
    }

    async fn generate(&self, query: &str) -> Result<String> {
        let prompt = build_hyde_prompt(query);
        let content = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.model.invoke(&prompt))
                .await
                .map_err(|_| anyhow::anyhow!("model did not answer within {limit:?}"))??,
            None => self.model.invoke(&prompt).await?,
        };

        let content = content.trim();
        if content.is_empty() {
            anyhow::bail!("model returned an empty passage");
        }
        Ok(content.to_string())
    }
}
