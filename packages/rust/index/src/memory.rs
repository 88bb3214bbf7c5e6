//! In-memory [`IndexPublisher`] for tests and offline runs.
//!
//! Ranks by naive token overlap instead of embeddings — good enough to
//! exercise the publish/query plumbing without external services.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use tramitero_shared::{Result, TramiteDoc};

use crate::IndexPublisher;

/// A process-local document store with token-overlap ranking.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    docs: Mutex<Vec<TramiteDoc>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

#[async_trait]
impl IndexPublisher for MemoryIndex {
    async fn reset(&self) -> Result<()> {
        self.docs.lock().expect("index lock poisoned").clear();
        Ok(())
    }

    async fn upsert(&self, documents: &[TramiteDoc]) -> Result<()> {
        self.docs
            .lock()
            .expect("index lock poisoned")
            .extend_from_slice(documents);
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<TramiteDoc>> {
        let query_tokens = tokenize(text);
        let docs = self.docs.lock().expect("index lock poisoned");

        let mut scored: Vec<(usize, &TramiteDoc)> = docs
            .iter()
            .map(|doc| {
                let doc_tokens = tokenize(&doc.body);
                let overlap = query_tokens.intersection(&doc_tokens).count();
                (overlap, doc)
            })
            .collect();

        // Stable sort keeps insertion order among ties, so results stay
        // deterministic.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tramitero_shared::DocMetadata;

    fn doc(body: &str, source: &str) -> TramiteDoc {
        TramiteDoc {
            body: body.into(),
            metadata: DocMetadata {
                source: source.into(),
                title: String::new(),
            },
        }
    }

    #[tokio::test]
    async fn query_ranks_by_overlap() {
        let index = MemoryIndex::new();
        index
            .upsert(&[
                doc("renovación de pasaporte ordinario", "https://x/1"),
                doc("matrícula vehicular anual", "https://x/2"),
            ])
            .await
            .unwrap();

        let hits = index.query("como renovar mi pasaporte", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.source, "https://x/1");
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let index = MemoryIndex::new();
        index.upsert(&[doc("algo", "https://x/1")]).await.unwrap();
        assert_eq!(index.len(), 1);

        index.reset().await.unwrap();
        assert!(index.is_empty());

        // Idempotent on an already-empty index.
        index.reset().await.unwrap();
    }

    #[tokio::test]
    async fn query_caps_at_k() {
        let index = MemoryIndex::new();
        index
            .upsert(&[
                doc("pasaporte uno", "https://x/1"),
                doc("pasaporte dos", "https://x/2"),
                doc("pasaporte tres", "https://x/3"),
            ])
            .await
            .unwrap();

        let hits = index.query("pasaporte", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
