//! The external semantic index boundary.
//!
//! The ingest pipeline hands its canonical documents to an [`IndexPublisher`]
//! and the answer service reads them back with [`IndexPublisher::query`]. The
//! actual heavy lifting — embedding computation and similarity search — lives
//! behind this trait in external services:
//! - [`ChromaIndex`] — a Chroma server over HTTP, with embeddings computed
//!   through an OpenAI-compatible endpoint ([`EmbeddingClient`]).
//! - [`MemoryIndex`] — an in-process stand-in for tests and offline runs.

mod chroma;
mod embedding;
mod memory;

use async_trait::async_trait;

use tramitero_shared::{Result, TramiteDoc};

pub use chroma::ChromaIndex;
pub use embedding::EmbeddingClient;
pub use memory::MemoryIndex;

/// The external vector-store collaborator.
///
/// Publishing is a full rebuild: callers `reset()` first, then `upsert()` a
/// clean, deduplicated batch. The two calls are intentionally separate —
/// reset is destructive and there is no rollback, so the pipeline never
/// claims success unless the upsert after it completed.
#[async_trait]
pub trait IndexPublisher: Send + Sync {
    /// Discard any previously published index contents.
    ///
    /// Idempotent; succeeds when no prior index exists.
    async fn reset(&self) -> Result<()>;

    /// Embed and store a batch of documents, making them queryable.
    async fn upsert(&self, documents: &[TramiteDoc]) -> Result<()>;

    /// Return the `k` documents nearest to `text` by embedding similarity,
    /// best match first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<TramiteDoc>>;
}
