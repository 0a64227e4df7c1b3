//! Utterance analysis.
//!
//! Turns one learner utterance into a structured [`Analysis`] by asking the
//! oracle for a strict JSON answer. The analyzer never fails: any transport
//! or parse problem yields [`Analysis::fallback`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::config::{Language, Level};
use crate::error::{Result, TutorError};
use crate::oracle::{complete_within, Oracle};

/// One grammar mistake found in an utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarError {
    /// The offending fragment as the learner wrote it.
    pub error: String,
    /// The corrected fragment.
    pub correction: String,
    /// Why the correction applies.
    #[serde(default)]
    pub explanation: String,
}

impl GrammarError {
    /// Creates a new `GrammarError`.
    #[must_use]
    pub fn new(
        error: impl Into<String>,
        correction: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            correction: correction.into(),
            explanation: explanation.into(),
        }
    }
}

/// Structured linguistic analysis of one utterance.
///
/// Serialized with the camelCase field names the oracle is asked to produce.
/// Missing or `null` arrays deserialize as empty, missing strings as `""`;
/// unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Mistakes in the order the oracle reported them.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub grammar_errors: Vec<GrammarError>,
    /// Things the learner did well, in order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub positive_aspects: Vec<String>,
    /// Short encouraging comment.
    #[serde(default)]
    pub overall_feedback: String,
    /// What to focus on next.
    #[serde(default)]
    pub suggested_improvement: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Analysis {
    /// The analysis used whenever the oracle cannot provide one.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            grammar_errors: Vec::new(),
            positive_aspects: vec!["Good effort!".to_string()],
            overall_feedback: "Keep practicing!".to_string(),
            suggested_improvement: "Continue learning".to_string(),
        }
    }

    /// Parses an oracle answer into an analysis.
    ///
    /// Surrounding whitespace and one enclosing Markdown code fence are
    /// tolerated; anything else must be the exact JSON shape.
    pub fn from_oracle_text(text: &str) -> Result<Self> {
        serde_json::from_str(strip_code_fence(text))
            .map_err(|e| TutorError::oracle_parse(e.to_string()))
    }

    /// Number of grammar corrections this analysis contributes to the stats.
    #[must_use]
    pub fn correction_count(&self) -> usize {
        self.grammar_errors.len()
    }
}

/// Removes a single ```` ``` ```` or ```` ```json ```` fence around `text`.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    body.split_once('\n').map_or(body, |(_, inner)| inner).trim()
}

/// Builds the analysis prompt for one utterance.
#[must_use]
pub fn analysis_prompt(utterance: &str, language: Language, level: Level) -> String {
    format!(
        r#"Analyze this {language} message from a {level} level learner: "{utterance}"

Focus on these areas:
1. Verb tenses (past continuous vs simple past)
2. Articles (a, an, the)
3. Sentence structure
4. Vocabulary

Respond with JSON only:
{{
  "grammarErrors": [{{"error": "mistake", "correction": "fix", "explanation": "why"}}],
  "positiveAspects": ["good things"],
  "overallFeedback": "encouraging comment",
  "suggestedImprovement": "next focus"
}}"#
    )
}

/// Produces an [`Analysis`] for each learner utterance.
#[derive(Clone)]
pub struct UtteranceAnalyzer {
    oracle: Arc<dyn Oracle>,
    deadline: Option<Duration>,
}

impl UtteranceAnalyzer {
    /// Creates an analyzer that consults `oracle`.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            deadline: None,
        }
    }

    /// Bounds each oracle call; on expiry the fallback analysis is used.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Analyzes `utterance`, falling back to [`Analysis::fallback`] on any failure.
    pub async fn analyze(&self, utterance: &str, language: Language, level: Level) -> Analysis {
        match self.try_analyze(utterance, language, level).await {
            Ok(analysis) => {
                debug!(
                    grammar_errors = analysis.grammar_errors.len(),
                    positives = analysis.positive_aspects.len(),
                    "Utterance analyzed"
                );
                analysis
            }
            Err(e) => {
                warn!(error = %e, "Analysis unavailable, using fallback");
                Analysis::fallback()
            }
        }
    }

    /// Analyzes `utterance`, surfacing oracle and parse failures.
    pub async fn try_analyze(
        &self,
        utterance: &str,
        language: Language,
        level: Level,
    ) -> Result<Analysis> {
        let prompt = analysis_prompt(utterance, language, level);
        let answer = complete_within(self.oracle.as_ref(), &prompt, self.deadline).await?;
        Analysis::from_oracle_text(&answer)
    }
}

impl std::fmt::Debug for UtteranceAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtteranceAnalyzer")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
