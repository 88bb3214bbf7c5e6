//! Chat-completion client for OpenAI-compatible endpoints (Groq).
//!
//! The language model is an external black box: messages go out, one
//! completion string comes back. Both the query rewriter and the grounded
//! answer call go through this client.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use tramitero_shared::{Result, TramiteroError};

/// Timeout for completion requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("Tramitero/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    /// Build a client for the given endpoint, key, and model.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        Url::parse(base_url).map_err(|e| {
            TramiteroError::config(format!("invalid completion URL '{base_url}': {e}"))
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TramiteroError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// The configured completion model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a message list and return the first choice's content.
    pub async fn complete(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        debug!(model = %self.model, messages = messages.len(), "completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TramiteroError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TramiteroError::Completion(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TramiteroError::parse(format!("completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TramiteroError::Completion("response carried no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3-8b-8192",
                "messages": [{"role": "user", "content": "hola"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "¡Hola!"}}]
            })))
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri(), "test-key", "llama3-8b-8192").unwrap();
        let reply = client.complete(&[Message::user("hola")]).await.unwrap();
        assert_eq!(reply, "¡Hola!");
    }

    #[tokio::test]
    async fn api_error_body_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string("rate limit exceeded"),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri(), "test-key", "llama3-8b-8192").unwrap();
        let err = client.complete(&[Message::user("hola")]).await.unwrap_err();
        assert!(matches!(err, TramiteroError::Completion(_)));
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri(), "test-key", "llama3-8b-8192").unwrap();
        let err = client.complete(&[Message::user("hola")]).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn message_roles_serialize_lowercase() {
        let msg = Message::system("instrucciones");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
    }
}
