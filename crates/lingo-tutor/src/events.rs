//! Session event types and broadcasting.
//!
//! The session manager publishes an event for every observable change so a
//! front end can redraw the transcript, the feedback sidebar and the stats
//! panel without polling.
//!
//! # Event Types
//!
//! - `turn_started` - An utterance was accepted
//! - `message_appended` - A message was added to the transcript
//! - `feedback_published` - The feedback list was replaced
//! - `stats_updated` - Session statistics changed
//! - `turn_completed` - The session is idle again
//! - `transcript_reset` - Language or level changed and the transcript restarted
//!
//! # Example
//!
//! ```no_run
//! use lingo_tutor::events::{EventBroadcaster, SessionEvent};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(SessionEvent::turn_completed(false));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {}", event.event_name());
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::{Language, Level};
use crate::feedback::FeedbackEvent;
use crate::state::{Message, SessionStats};

/// Session events, serialized as objects with `event` and `payload` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    /// An utterance was accepted and a turn began.
    TurnStarted {
        /// The submitted utterance, trimmed.
        utterance: String,
    },
    /// A message was appended to the transcript.
    MessageAppended(Message),
    /// The feedback list was replaced.
    FeedbackPublished {
        /// The new feedback list.
        feedback: Vec<FeedbackEvent>,
    },
    /// Session statistics changed.
    StatsUpdated(SessionStats),
    /// The turn finished and the session is idle.
    TurnCompleted {
        /// `true` if the turn took the defensive fallback path.
        degraded: bool,
    },
    /// The transcript was reset to a fresh greeting.
    TranscriptReset {
        /// Language now being practiced.
        language: Language,
        /// Learner level now in effect.
        level: Level,
        /// The greeting that starts the new transcript.
        greeting: Message,
    },
}

impl SessionEvent {
    /// Creates a `TurnStarted` event.
    #[must_use]
    pub fn turn_started(utterance: impl Into<String>) -> Self {
        Self::TurnStarted {
            utterance: utterance.into(),
        }
    }

    /// Creates a `FeedbackPublished` event.
    #[must_use]
    pub const fn feedback_published(feedback: Vec<FeedbackEvent>) -> Self {
        Self::FeedbackPublished { feedback }
    }

    /// Creates a `TurnCompleted` event.
    #[must_use]
    pub const fn turn_completed(degraded: bool) -> Self {
        Self::TurnCompleted { degraded }
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::TurnStarted { .. } => "turn_started",
            Self::MessageAppended(_) => "message_appended",
            Self::FeedbackPublished { .. } => "feedback_published",
            Self::StatsUpdated(_) => "stats_updated",
            Self::TurnCompleted { .. } => "turn_completed",
            Self::TranscriptReset { .. } => "transcript_reset",
        }
    }
}

/// Broadcasts session events to every subscriber.
///
/// Uses a tokio broadcast channel. Events are not kept for subscribers that
/// join later.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Creates a new `EventBroadcaster` with the given per-subscriber buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber.
    ///
    /// A subscriber that falls behind receives a `Lagged` error and misses
    /// the oldest events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event and returns how many subscribers will see it.
    pub fn send(&self, event: SessionEvent) -> usize {
        // send() only fails when nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
