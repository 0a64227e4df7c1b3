//! Learning goals shown alongside the conversation.

use serde::{Deserialize, Deserializer, Serialize};

/// Upper bound for goal progress.
pub const MAX_PROGRESS: u8 = 100;

/// A learning goal with a progress percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGoal {
    /// Goal identifier.
    pub id: u32,
    /// What the learner is working towards.
    pub text: String,
    /// Progress in percent, always within `0..=100`.
    #[serde(deserialize_with = "deserialize_progress")]
    progress_percent: u8,
    /// Whether the goal has been marked complete.
    pub completed: bool,
}

impl LearningGoal {
    /// Creates a goal, clamping `progress_percent` to 100.
    #[must_use]
    pub fn new(id: u32, text: impl Into<String>, progress_percent: u8) -> Self {
        Self {
            id,
            text: text.into(),
            progress_percent: progress_percent.min(MAX_PROGRESS),
            completed: false,
        }
    }

    /// Returns the progress in percent.
    #[must_use]
    pub const fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Updates progress, clamping to 100.
    pub fn set_progress(&mut self, progress_percent: u8) {
        self.progress_percent = progress_percent.min(MAX_PROGRESS);
    }

    /// Marks the goal complete at full progress.
    pub fn complete(&mut self) {
        self.progress_percent = MAX_PROGRESS;
        self.completed = true;
    }
}

/// Reads a stored progress value, clamping it like [`LearningGoal::set_progress`].
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    u8::deserialize(deserializer).map(|progress| progress.min(MAX_PROGRESS))
}

/// The goals every new session starts with.
#[must_use]
pub fn default_goals() -> Vec<LearningGoal> {
    vec![
        LearningGoal::new(1, "Master past continuous vs simple past", 65),
        LearningGoal::new(2, "Use articles (a, an, the) correctly", 40),
        LearningGoal::new(3, "Improve pronunciation accuracy", 30),
        LearningGoal::new(4, "Expand business vocabulary", 20),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        let mut goal = LearningGoal::new(9, "Phrasal verbs", 250);
        assert_eq!(goal.progress_percent(), 100);

        goal.set_progress(42);
        assert_eq!(goal.progress_percent(), 42);

        goal.set_progress(u8::MAX);
        assert_eq!(goal.progress_percent(), 100);
    }

    #[test]
    fn test_complete() {
        let mut goal = LearningGoal::new(1, "Articles", 40);
        goal.complete();
        assert!(goal.completed);
        assert_eq!(goal.progress_percent(), 100);
    }

    #[test]
    fn test_default_goals() {
        let goals = default_goals();
        assert_eq!(goals.len(), 4);
        assert_eq!(goals[0].progress_percent(), 65);
        assert!(goals.iter().all(|g| !g.completed));
        assert!(goals.iter().all(|g| g.progress_percent() <= MAX_PROGRESS));
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&LearningGoal::new(2, "Articles", 40)).unwrap();
        assert!(json.contains(r#""progressPercent":40"#));
        assert!(json.contains(r#""completed":false"#));
    }

    #[test]
    fn test_deserialization_clamps_progress() {
        let json = r#"{"id": 5, "text": "Idioms", "progressPercent": 250, "completed": false}"#;
        let goal: LearningGoal = serde_json::from_str(json).unwrap();
        assert_eq!(goal.progress_percent(), 100);

        let json = r#"{"id": 6, "text": "Idioms", "progressPercent": 35, "completed": true}"#;
        let goal: LearningGoal = serde_json::from_str(json).unwrap();
        assert_eq!(goal.progress_percent(), 35);
        assert!(goal.completed);
    }
}
