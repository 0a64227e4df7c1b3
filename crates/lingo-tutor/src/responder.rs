//! Tutor reply generation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::analyzer::Analysis;
use crate::config::{Language, Level, Mode};
use crate::error::{Result, TransportKind, TutorError};
use crate::oracle::{complete_within, Oracle};

/// Reply used whenever the oracle cannot produce one.
pub const FALLBACK_REPLY: &str =
    "Great! Let's continue practicing. What else would you like to talk about?";

/// Builds the reply prompt for one turn.
#[must_use]
pub fn reply_prompt(
    utterance: &str,
    analysis: &Analysis,
    language: Language,
    level: Level,
    mode: Mode,
) -> String {
    // Analysis holds only strings and vectors of strings.
    let analysis_json = serde_json::to_string(analysis).unwrap_or_default();
    format!(
        "You are a friendly {language} tutor for a {level} student.
Student said: \"{utterance}\"
Analysis: {analysis_json}

Respond naturally and encouragingly. Ask a follow-up question.
Mode: {mode}

Response only (no JSON):"
    )
}

/// Produces the tutor's next message.
#[derive(Clone)]
pub struct TutorResponder {
    oracle: Arc<dyn Oracle>,
    deadline: Option<Duration>,
}

impl TutorResponder {
    /// Creates a responder that consults `oracle`.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            deadline: None,
        }
    }

    /// Bounds each oracle call; on expiry the fallback reply is used.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Generates a reply, falling back to [`FALLBACK_REPLY`] on any failure.
    pub async fn respond(
        &self,
        utterance: &str,
        analysis: &Analysis,
        language: Language,
        level: Level,
        mode: Mode,
    ) -> String {
        match self
            .try_respond(utterance, analysis, language, level, mode)
            .await
        {
            Ok(reply) => {
                debug!(reply_chars = reply.len(), "Tutor reply generated");
                reply
            }
            Err(e) => {
                warn!(error = %e, "Reply unavailable, using fallback");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Generates a reply, surfacing oracle failures and empty answers.
    pub async fn try_respond(
        &self,
        utterance: &str,
        analysis: &Analysis,
        language: Language,
        level: Level,
        mode: Mode,
    ) -> Result<String> {
        let prompt = reply_prompt(utterance, analysis, language, level, mode);
        let answer = complete_within(self.oracle.as_ref(), &prompt, self.deadline).await?;
        let reply = answer.trim();
        if reply.is_empty() {
            return Err(TutorError::oracle_transport(
                TransportKind::Other,
                "oracle returned an empty reply",
            ));
        }
        Ok(reply.to_string())
    }
}

impl std::fmt::Debug for TutorResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorResponder")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
