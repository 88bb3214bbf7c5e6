//! [`IndexPublisher`] backed by a Chroma server.
//!
//! Talks to the Chroma REST surface (`/api/v1/collections`). Embeddings are
//! computed client-side through an [`EmbeddingClient`] and shipped alongside
//! the document bodies; similarity search happens inside the server.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use tramitero_shared::{DocMetadata, Result, TramiteDoc, TramiteroError};

use crate::{EmbeddingClient, IndexPublisher};

/// Timeout for index requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User-Agent string for index requests.
const USER_AGENT: &str = concat!("Tramitero/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    /// Ranked bodies, one inner list per query embedding.
    documents: Option<Vec<Vec<Option<String>>>>,
    /// Ranked metadata maps, aligned with `documents`.
    metadatas: Option<Vec<Vec<Option<DocMetadata>>>>,
}

// ---------------------------------------------------------------------------
// ChromaIndex
// ---------------------------------------------------------------------------

/// A named collection on a Chroma server.
pub struct ChromaIndex {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    embedder: EmbeddingClient,
}

impl ChromaIndex {
    /// Build a client for `collection` on the server at `base_url`.
    pub fn new(base_url: &str, collection: &str, embedder: EmbeddingClient) -> Result<Self> {
        Url::parse(base_url).map_err(|e| {
            TramiteroError::config(format!("invalid index URL '{base_url}': {e}"))
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TramiteroError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            embedder,
        })
    }

    /// The collection this index publishes into.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Resolve the collection id, creating the collection if needed.
    async fn collection_id(&self) -> Result<String> {
        let url = format!("{}/api/v1/collections", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "name": self.collection,
                "get_or_create": true,
            }))
            .send()
            .await
            .map_err(|e| TramiteroError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TramiteroError::Index(format!(
                "create collection '{}': HTTP {status}: {body}",
                self.collection
            )));
        }

        let info: CollectionInfo = response
            .json()
            .await
            .map_err(|e| TramiteroError::parse(format!("collection response: {e}")))?;

        Ok(info.id)
    }
}

/// Stable document id: hex SHA-256 of the source URL.
fn doc_id(doc: &TramiteDoc) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc.metadata.source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl IndexPublisher for ChromaIndex {
    /// Delete the collection. A 404 means there was nothing to discard,
    /// which satisfies the idempotence contract.
    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn reset(&self) -> Result<()> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, self.collection);

        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| TramiteroError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            info!("index reset");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TramiteroError::Index(format!(
            "reset collection '{}': HTTP {status}: {body}",
            self.collection
        )))
    }

    #[instrument(skip_all, fields(collection = %self.collection, documents = documents.len()))]
    async fn upsert(&self, documents: &[TramiteDoc]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let collection_id = self.collection_id().await?;

        let bodies: Vec<String> = documents.iter().map(|d| d.body.clone()).collect();
        let embeddings = self.embedder.embed_batch(&bodies).await?;

        let ids: Vec<String> = documents.iter().map(doc_id).collect();
        let metadatas: Vec<&DocMetadata> = documents.iter().map(|d| &d.metadata).collect();

        let url = format!(
            "{}/api/v1/collections/{collection_id}/add",
            self.base_url
        );

        debug!(model = %self.embedder.model(), "publishing embedded documents");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": bodies,
                "metadatas": metadatas,
            }))
            .send()
            .await
            .map_err(|e| TramiteroError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TramiteroError::Index(format!(
                "upsert into '{}': HTTP {status}: {body}",
                self.collection
            )));
        }

        info!(count = documents.len(), "documents published");
        Ok(())
    }

    #[instrument(skip_all, fields(collection = %self.collection, k))]
    async fn query(&self, text: &str, k: usize) -> Result<Vec<TramiteDoc>> {
        let collection_id = self.collection_id().await?;
        let embedding = self.embedder.embed(text).await?;

        let url = format!(
            "{}/api/v1/collections/{collection_id}/query",
            self.base_url
        );

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "query_embeddings": [embedding],
                "n_results": k,
                "include": ["documents", "metadatas"],
            }))
            .send()
            .await
            .map_err(|e| TramiteroError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TramiteroError::Index(format!(
                "query '{}': HTTP {status}: {body}",
                self.collection
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| TramiteroError::parse(format!("query response: {e}")))?;

        let bodies = parsed
            .documents
            .and_then(|mut rows| (!rows.is_empty()).then(|| rows.remove(0)))
            .unwrap_or_default();
        let mut metadatas = parsed
            .metadatas
            .and_then(|mut rows| (!rows.is_empty()).then(|| rows.remove(0)))
            .unwrap_or_default();
        metadatas.resize(bodies.len(), None);

        let docs = bodies
            .into_iter()
            .zip(metadatas)
            .filter_map(|(body, metadata)| {
                body.map(|body| TramiteDoc {
                    body,
                    metadata: metadata.unwrap_or_default(),
                })
            })
            .collect();

        Ok(docs)
    }
}
