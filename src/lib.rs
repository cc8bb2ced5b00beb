//! # notes-retrieval
//!
//! Retrieves the passages of a personal note vault that best ground a
//! language-model answer, combining notes the user names explicitly with
//! HyDE-assisted vector search.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────┐
//!                        │  User Query  │
//!                        └──────┬───────┘
//!                               │
//!              ┌────────────────┴────────────────┐
//!              ▼                                 ▼
//!     ┌─────────────────┐              ┌──────────────────┐
//!     │ [[Title]] scan  │              │  HyDE rewrite    │
//!     │  resolve → path │              │  (LLM, optional) │
//!     └────────┬────────┘              └────────┬─────────┘
//!              │                                │ fallback: original query
//!              ▼                                ▼
//!     ┌─────────────────┐              ┌──────────────────┐
//!     │ all passages of │              │ embed + cosine   │
//!     │ each named note │              │ search ≥ min     │
//!     └────────┬────────┘              └────────┬─────────┘
//!              │ explicit (unscored)            │ vector (scored)
//!              └────────────────┬───────────────┘
//!                               ▼
//!                  ┌───────────────────────────┐
//!                  │  Merge: explicit first,   │
//!                  │  dedup by content, max_k  │
//!                  └─────────────┬─────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │     Retrieved passages    │
//!                  └───────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for the vault, index, LLM and retrieval
//! - [`models`] - Passage types and request/response bodies
//! - [`error`] - Fatal retrieval failures
//! - [`vault`] - Title → note path resolution over a markdown directory
//! - [`search::title`] - `[[Title]]` extraction
//! - [`search::vector`] - In-memory passage index with cosine similarity and disk persistence
//! - [`search::explicit`] - Passages of explicitly named notes
//! - [`search::merge`] - Merge policies combining explicit and vector results
//! - [`search::retriever`] - The hybrid retrieval entry point
//! - [`llm::embeddings`] - Query embedding via Ollama or OpenAI-compatible APIs
//! - [`llm::chat`] - Single-turn chat completion
//! - [`llm::hyde`] - Hypothetical-document query rewriting
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state wiring the collaborators together

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
pub mod vault;
