//! HTTP client for an OpenAI-compatible embeddings endpoint.
//!
//! The embedding model itself is an external service (a TEI or Ollama
//! deployment serving e.g. `all-MiniLM-L6-v2`); this client only ships text
//! out and vectors back.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use tramitero_shared::{Result, TramiteroError};

/// Default timeout for embedding requests. Batch calls over a full document
/// set can take a while on CPU-only deployments.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// User-Agent string for embedding requests.
const USER_AGENT: &str = concat!("Tramitero/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for `POST {base_url}/embeddings`.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    /// Build a client for the given endpoint and model.
    ///
    /// `api_key` is optional: local deployments typically run without one.
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Result<Self> {
        Url::parse(base_url).map_err(|e| {
            TramiteroError::config(format!("invalid embeddings URL '{base_url}': {e}"))
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TramiteroError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// The configured embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .request(serde_json::Value::String(text.to_string()))
            .await?;

        vectors.pop().ok_or_else(|| {
            TramiteroError::Network("embeddings endpoint returned no vectors".into())
        })
    }

    /// Embed a batch of texts, preserving input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let input = serde_json::Value::Array(
            texts
                .iter()
                .map(|t| serde_json::Value::String(t.clone()))
                .collect(),
        );

        let vectors = self.request(input).await?;

        if vectors.len() != texts.len() {
            return Err(TramiteroError::Network(format!(
                "embeddings endpoint returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };

        debug!(model = %self.model, "embedding request");

        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TramiteroError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TramiteroError::Network(format!(
                "{url}: HTTP {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| TramiteroError::parse(format!("embeddings response: {e}")))?;

        // The API may return items out of order; restore input order by index.
        let mut items = parsed.data;
        items.sort_by_key(|item| item.index);

        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}
