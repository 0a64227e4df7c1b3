//! Session state types.
//!
//! This module defines the data owned by the session manager: the turn
//! status, the conversation transcript and the cumulative statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Language, Level, Mode};
use crate::feedback::FeedbackEvent;

// ============================================================================
// SessionStatus
// ============================================================================

/// Whether a turn is currently in flight.
///
/// - `Idle` -> `Busy` on an accepted submission
/// - `Busy` -> `Idle` when the turn finishes, including its fallback path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Ready to accept a submission.
    #[default]
    Idle,
    /// Exactly one turn is in flight.
    Busy,
}

impl SessionStatus {
    /// Returns `true` while a turn is in flight.
    ///
    /// # Examples
    ///
    /// ```
    /// use lingo_tutor::SessionStatus;
    ///
    /// assert!(SessionStatus::Busy.is_busy());
    /// assert!(!SessionStatus::Idle.is_busy());
    /// ```
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Who wrote a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The learner.
    User,
    /// The AI tutor.
    Tutor,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Identifier, strictly increasing within a session.
    pub id: u64,
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub text: String,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(id: u64, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Append-only, ordered conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends a message and returns a copy of it.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> Message {
        let message = Message::new(self.next_id, role, text);
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }

    /// Drops every message and starts over with a single tutor message.
    ///
    /// Ids keep increasing across resets.
    pub fn reset_with(&mut self, greeting: impl Into<String>) -> Message {
        self.messages.clear();
        self.append(Role::Tutor, greeting)
    }

    /// Returns the messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the transcript holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ============================================================================
// SessionStats
// ============================================================================

/// Cumulative statistics for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Completed turns.
    pub message_count: u32,
    /// Grammar errors reported across all turns.
    pub grammar_correction_count: u32,
    /// Whole minutes since the session started, as of the last turn.
    pub duration_minutes: u32,
}

impl SessionStats {
    /// Records one completed turn.
    ///
    /// Counters saturate rather than wrap. The duration never decreases, even
    /// if `now` is earlier than at the previous turn.
    pub fn record_turn(&mut self, corrections: usize, started_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.message_count = self.message_count.saturating_add(1);
        let corrections = u32::try_from(corrections).unwrap_or(u32::MAX);
        self.grammar_correction_count = self.grammar_correction_count.saturating_add(corrections);
        self.duration_minutes = self
            .duration_minutes
            .max(elapsed_minutes(started_at, now));
    }
}

/// Whole minutes between two instants, zero if `now` precedes `start`.
#[must_use]
pub fn elapsed_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let minutes = (now - start).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Point-in-time copy of everything the session manager owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Turn status.
    pub status: SessionStatus,
    /// Language being practiced.
    pub language: Language,
    /// Learner level.
    pub level: Level,
    /// Conversation mode.
    pub mode: Mode,
    /// Transcript messages in order.
    pub messages: Vec<Message>,
    /// Feedback from the most recent turn.
    pub feedback: Vec<FeedbackEvent>,
    /// Cumulative statistics.
    pub stats: SessionStats,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}
