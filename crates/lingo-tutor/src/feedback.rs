//! Feedback events derived from an analysis.

use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;

/// One displayable feedback item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    /// A grammar correction, rendered as `"<error>" → "<correction>"`.
    Correction {
        /// The rendered correction.
        message: String,
        /// Why the correction applies.
        explanation: String,
    },
    /// Something the learner did well.
    Positive {
        /// The praised aspect.
        message: String,
    },
}

impl FeedbackEvent {
    /// Returns the headline text of the event.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Correction { message, .. } | Self::Positive { message } => message,
        }
    }

    /// Returns `true` for correction events.
    #[must_use]
    pub const fn is_correction(&self) -> bool {
        matches!(self, Self::Correction { .. })
    }
}

/// Projects an analysis into its feedback sequence.
///
/// All corrections come first, in analysis order, followed by all positives
/// in analysis order. The result replaces the previous turn's feedback.
#[must_use]
pub fn project(analysis: &Analysis) -> Vec<FeedbackEvent> {
    let corrections = analysis
        .grammar_errors
        .iter()
        .map(|e| FeedbackEvent::Correction {
            message: format!("\"{}\" → \"{}\"", e.error, e.correction),
            explanation: e.explanation.clone(),
        });

    let positives = analysis
        .positive_aspects
        .iter()
        .map(|aspect| FeedbackEvent::Positive {
            message: aspect.clone(),
        });

    corrections.chain(positives).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analyzer::GrammarError;

    fn analysis(errors: Vec<GrammarError>, positives: &[&str]) -> Analysis {
        Analysis {
            grammar_errors: errors,
            positive_aspects: positives.iter().map(ToString::to_string).collect(),
            overall_feedback: "ok".to_string(),
            suggested_improvement: "more".to_string(),
        }
    }

    #[test]
    fn test_project_single_correction_and_positive() {
        let events = project(&analysis(
            vec![GrammarError::new("I seen", "I saw", "simple past")],
            &["Good vocabulary"],
        ));

        assert_eq!(
            events,
            vec![
                FeedbackEvent::Correction {
                    message: "\"I seen\" → \"I saw\"".to_string(),
                    explanation: "simple past".to_string(),
                },
                FeedbackEvent::Positive {
                    message: "Good vocabulary".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_project_keeps_group_order() {
        let events = project(&analysis(
            vec![
                GrammarError::new("a apple", "an apple", "vowel sound"),
                GrammarError::new("he go", "he goes", "third person"),
            ],
            &["Clear structure", "Nice idiom"],
        ));

        let messages: Vec<&str> = events.iter().map(FeedbackEvent::message).collect();
        assert_eq!(
            messages,
            vec![
                "\"a apple\" → \"an apple\"",
                "\"he go\" → \"he goes\"",
                "Clear structure",
                "Nice idiom",
            ]
        );

        let first_positive = events.iter().position(|e| !e.is_correction()).unwrap();
        assert!(events[first_positive..].iter().all(|e| !e.is_correction()));
    }

    #[test]
    fn test_project_fallback_is_single_positive() {
        let events = project(&Analysis::fallback());
        assert_eq!(
            events,
            vec![FeedbackEvent::Positive {
                message: "Good effort!".to_string()
            }]
        );
    }

    #[test]
    fn test_project_empty_analysis() {
        assert!(project(&analysis(vec![], &[])).is_empty());
    }

    #[test]
    fn test_feedback_event_serialization() {
        let event = FeedbackEvent::Positive {
            message: "Nice".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"positive","message":"Nice"}"#);

        let event: FeedbackEvent = serde_json::from_str(
            r#"{"type":"correction","message":"m","explanation":"e"}"#,
        )
        .unwrap();
        assert!(event.is_correction());
    }
}
