//! The language oracle boundary.
//!
//! The oracle is the external analysis/completion capability: one prompt in,
//! one text answer out. Implementations make exactly one attempt per call and
//! report failures as [`TutorError::OracleTransport`]; they never retry.
//!
//! - [`ClaudeOracle`] talks to the Anthropic Messages API over HTTP.
//! - [`ScriptedOracle`] replays canned answers, for tests and offline use.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OracleConfig;
use crate::error::{Result, TransportKind, TutorError};

/// Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// An asynchronous prompt-to-text completion capability.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Sends `prompt` and returns the raw text answer.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Runs one oracle call, failing with a `timeout` transport error if
/// `deadline` elapses first.
pub async fn complete_within(
    oracle: &dyn Oracle,
    prompt: &str,
    deadline: Option<Duration>,
) -> Result<String> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, oracle.complete(prompt))
            .await
            .unwrap_or_else(|_| {
                Err(TutorError::oracle_transport(
                    TransportKind::Timeout,
                    format!("no answer within {}s", limit.as_secs()),
                ))
            }),
        None => oracle.complete(prompt).await,
    }
}

// ============================================================================
// ClaudeOracle
// ============================================================================

/// Oracle backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct ClaudeOracle {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeOracle {
    /// Creates a client with an explicit API key.
    pub fn new(api_key: impl Into<String>, config: &OracleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .build()
            .map_err(|e| {
                TutorError::oracle_transport(
                    TransportKind::Other,
                    format!("failed to build HTTP client: {e}"),
                )
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Creates a client reading the API key from the configured environment variable.
    pub fn from_env(config: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TutorError::missing_api_key(&config.api_key_env))?;
        Self::new(api_key, config)
    }

    /// Returns the model identifier sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Oracle for ClaudeOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending oracle request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    TransportKind::Timeout
                } else {
                    TransportKind::Network
                };
                TutorError::oracle_transport(kind, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TutorError::oracle_transport(
                classify_status(status),
                format!("HTTP {status}: {detail}"),
            ));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            TutorError::oracle_transport(
                TransportKind::Other,
                format!("malformed response body: {e}"),
            )
        })?;

        parsed.into_text()
    }
}

/// Maps an unsuccessful HTTP status to a transport failure kind.
fn classify_status(status: StatusCode) -> TransportKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS => TransportKind::RateLimit,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => TransportKind::Timeout,
        s if s.is_server_error() => TransportKind::Server,
        _ => TransportKind::Other,
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

impl MessagesResponse {
    fn into_text(self) -> Result<String> {
        let text: Vec<String> = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Unsupported => None,
            })
            .collect();

        if text.is_empty() {
            return Err(TutorError::oracle_transport(
                TransportKind::Other,
                "response contained no text content",
            ));
        }

        Ok(text.concat())
    }
}

// ============================================================================
// ScriptedOracle
// ============================================================================

/// One canned outcome for a [`ScriptedOracle`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    /// Answer immediately with this text.
    Reply(String),
    /// Answer with this text after a delay.
    Delayed(Duration, String),
    /// Fail with a transport error of this kind.
    Fail(TransportKind),
}

impl ScriptedAnswer {
    /// Shorthand for [`ScriptedAnswer::Reply`].
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

/// Oracle that replays a fixed queue of answers in order.
///
/// Once the queue is empty every call fails with a `network` transport
/// error, so an empty script drives every turn down its fallback path.
/// Each prompt received is recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Creates an oracle that will hand out `answers` in order.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates an oracle that fails every call.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Returns every prompt received so far, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of answers not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let next = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(ScriptedAnswer::Reply(text)) => Ok(text),
            Some(ScriptedAnswer::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(ScriptedAnswer::Fail(kind)) => Err(TutorError::oracle_transport(
                kind,
                "scripted failure",
            )),
            None => Err(TutorError::oracle_transport(
                TransportKind::Network,
                "no scripted answer left",
            )),
        }
    }
}
