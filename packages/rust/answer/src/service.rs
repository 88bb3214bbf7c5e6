//! The answer pipeline: rewrite → retrieve → compose.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use tramitero_index::IndexPublisher;
use tramitero_llm::{CompletionClient, Message};
use tramitero_shared::Result;

use crate::prompts::{self, NOT_FOUND_MESSAGE, RESPONSE_PROMPT, REWRITE_PROMPT};

/// Separator between document bodies in the answer context.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// A composed answer plus the sources it was grounded on.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Answer {
    /// The model's reply (or the fixed not-found message).
    pub response: String,
    /// Source URLs of the retrieved documents, best match first.
    pub sources: Vec<String>,
}

/// Question-answering over an [`IndexPublisher`] and a completion endpoint.
pub struct AnswerService {
    index: Arc<dyn IndexPublisher>,
    llm: CompletionClient,
    top_k: usize,
}

impl AnswerService {
    pub fn new(index: Arc<dyn IndexPublisher>, llm: CompletionClient, top_k: usize) -> Self {
        Self { index, llm, top_k }
    }

    /// Answer a free-text question grounded on retrieved documents.
    ///
    /// The rewrite step is best-effort: if the model call fails or returns
    /// nothing usable, retrieval falls back to the raw question rather than
    /// failing the whole request. Retrieval and composition failures are
    /// surfaced — a degraded answer is acceptable, a fabricated one is not.
    #[instrument(skip_all)]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let query = match self.rewrite(question).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => {
                debug!(%rewritten, "question rewritten");
                rewritten
            }
            Ok(_) => {
                warn!("rewrite returned empty text, using raw question");
                question.to_string()
            }
            Err(e) => {
                warn!(error = %e, "rewrite failed, using raw question");
                question.to_string()
            }
        };

        let docs = self.index.query(&query, self.top_k).await?;

        if docs.is_empty() {
            info!("no documents retrieved, returning not-found message");
            return Ok(Answer {
                response: NOT_FOUND_MESSAGE.to_string(),
                sources: Vec::new(),
            });
        }

        let context = docs
            .iter()
            .map(|d| d.body.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let prompt = prompts::render(RESPONSE_PROMPT, question, &context);
        let response = self.llm.complete(&[Message::user(prompt)]).await?;

        let sources = docs
            .iter()
            .map(|d| d.metadata.source.clone())
            .filter(|s| !s.is_empty())
            .collect();

        info!(retrieved = docs.len(), "answer composed");

        Ok(Answer { response, sources })
    }

    /// One completion call turning the question into a formal search query.
    async fn rewrite(&self, question: &str) -> Result<String> {
        let prompt = prompts::render(REWRITE_PROMPT, question, "");
        let rewritten = self.llm.complete(&[Message::user(prompt)]).await?;
        Ok(rewritten.trim().trim_matches('"').to_string())
    }
}
