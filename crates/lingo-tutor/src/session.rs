//! Tutoring session state machine.
//!
//! [`SessionManager`] owns the transcript, the current feedback list and the
//! session statistics. Every method takes `&self`; state lives behind a
//! `tokio::sync::Mutex` that is never held across an oracle call.
//!
//! A turn runs strictly in order: the user message is appended and the session
//! goes `Busy`, the utterance is analyzed, feedback is published, the tutor
//! reply is generated and appended, stats are updated and the session returns
//! to `Idle`. Oracle failures are absorbed by the analyzer and responder. A
//! panic or an expired turn deadline is absorbed here.
//!
//! Accepted turns run on a spawned task, so a caller that stops waiting
//! cannot leave the session `Busy`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::analyzer::{Analysis, UtteranceAnalyzer};
use crate::config::{Config, Language, Level, Mode};
use crate::events::{EventBroadcaster, SessionEvent};
use crate::feedback::{self, FeedbackEvent};
use crate::goals::{default_goals, LearningGoal};
use crate::oracle::Oracle;
use crate::responder::TutorResponder;
use crate::scheduler::PracticeKind;
use crate::state::{Message, Role, SessionSnapshot, SessionStats, SessionStatus, Transcript};

/// Tutor message appended when a turn panics or overruns its deadline.
pub const TURN_FALLBACK_REPLY: &str = "Let's continue our conversation!";

/// The message that opens every transcript.
#[must_use]
pub fn greeting(language: Language, level: Level) -> String {
    format!(
        "Hello! I'm your AI language tutor. I see you're working on {language} at a {level} level. Let's practice together! What would you like to talk about today?"
    )
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a request was turned away without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The utterance was empty after trimming.
    EmptyUtterance,
    /// A turn is already in flight.
    Busy,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUtterance => write!(f, "nothing to send"),
            Self::Busy => write!(f, "the tutor is still answering"),
        }
    }
}

/// Everything a completed turn produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReport {
    /// The learner's message as appended.
    pub user_message: Message,
    /// The tutor's reply as appended.
    pub tutor_message: Message,
    /// The analysis used for this turn; `None` if the turn was aborted.
    pub analysis: Option<Analysis>,
    /// The feedback list after the turn.
    pub feedback: Vec<FeedbackEvent>,
    /// Statistics after the turn.
    pub stats: SessionStats,
    /// `true` if the turn panicked or ran out of time.
    pub degraded: bool,
}

/// Result of [`SessionManager::submit`].
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The turn ran to completion, possibly on a fallback path.
    Completed(Box<TurnReport>),
    /// Nothing happened.
    Rejected(Rejection),
}

impl SubmitOutcome {
    /// Returns the report of a completed turn.
    #[must_use]
    pub fn report(&self) -> Option<&TurnReport> {
        match self {
            Self::Completed(report) => Some(&**report),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the rejection reason, if any.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Completed(_) => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

/// Result of a language or level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    /// The value changed and the transcript restarted with this greeting.
    Applied(Message),
    /// The value was already in effect.
    Unchanged,
    /// The change was refused.
    Rejected(Rejection),
}

/// Why a turn did not finish normally.
#[derive(Debug, Clone, Copy)]
enum TurnAbort {
    Panicked,
    TimedOut,
}

// ============================================================================
// SessionManager
// ============================================================================

#[derive(Debug)]
struct Inner {
    status: SessionStatus,
    language: Language,
    level: Level,
    mode: Mode,
    transcript: Transcript,
    feedback: Vec<FeedbackEvent>,
    stats: SessionStats,
    started_at: DateTime<Utc>,
    goals: Vec<LearningGoal>,
}

/// Everything an in-flight turn needs, shared with the task that runs it.
#[derive(Debug)]
struct Shared {
    analyzer: UtteranceAnalyzer,
    responder: TutorResponder,
    events: EventBroadcaster,
    inner: Mutex<Inner>,
}

/// Owner of one tutoring session.
#[derive(Debug)]
pub struct SessionManager {
    turn_timeout: Option<Duration>,
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Starts a session with the configured language, level and mode.
    ///
    /// The transcript begins with the greeting.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, config: &Config) -> Self {
        Self::started_at(oracle, config, Utc::now())
    }

    /// Starts a session whose duration is measured from `started_at`.
    ///
    /// Each oracle call is bounded by `config.oracle.timeout_seconds`.
    #[must_use]
    pub fn started_at(oracle: Arc<dyn Oracle>, config: &Config, started_at: DateTime<Utc>) -> Self {
        let mut transcript = Transcript::new();
        transcript.append(Role::Tutor, greeting(config.language, config.level));
        let call_deadline = Some(Duration::from_secs(u64::from(
            config.oracle.timeout_seconds,
        )));

        Self {
            turn_timeout: config
                .turn_timeout_seconds
                .map(|secs| Duration::from_secs(u64::from(secs))),
            shared: Arc::new(Shared {
                analyzer: UtteranceAnalyzer::new(Arc::clone(&oracle)).with_deadline(call_deadline),
                responder: TutorResponder::new(oracle).with_deadline(call_deadline),
                events: EventBroadcaster::default(),
                inner: Mutex::new(Inner {
                    status: SessionStatus::Idle,
                    language: config.language,
                    level: config.level,
                    mode: config.mode,
                    transcript,
                    feedback: Vec::new(),
                    stats: SessionStats::default(),
                    started_at,
                    goals: default_goals(),
                }),
            }),
        }
    }

    /// Overrides the whole-turn deadline.
    #[must_use]
    pub const fn with_turn_timeout(mut self, turn_timeout: Option<Duration>) -> Self {
        self.turn_timeout = turn_timeout;
        self
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // ------------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------------

    /// Runs one conversation turn for `utterance`.
    ///
    /// Empty utterances and submissions while a turn is in flight are
    /// rejected without touching any state. An accepted turn always ends
    /// with a tutor message and the session back in `Idle`.
    ///
    /// The turn runs on its own task: dropping the returned future does not
    /// cancel it, the session still returns to `Idle` once it finishes.
    pub async fn submit(&self, utterance: &str) -> SubmitOutcome {
        let text = utterance.trim();
        if text.is_empty() {
            debug!("Rejected empty utterance");
            return SubmitOutcome::Rejected(Rejection::EmptyUtterance);
        }

        let (user_message, language, level, mode) = {
            let mut inner = self.shared.inner.lock().await;
            if inner.status.is_busy() {
                debug!("Rejected utterance: turn already in flight");
                return SubmitOutcome::Rejected(Rejection::Busy);
            }
            inner.status = SessionStatus::Busy;
            let message = inner.transcript.append(Role::User, text);
            (message, inner.language, inner.level, inner.mode)
        };

        debug!(
            message_id = user_message.id,
            %language,
            %level,
            %mode,
            "Turn started"
        );
        self.shared.events.send(SessionEvent::turn_started(text));
        self.shared
            .events
            .send(SessionEvent::MessageAppended(user_message.clone()));

        let shared = Arc::clone(&self.shared);
        let turn_timeout = self.turn_timeout;
        let message = user_message.clone();
        let task = tokio::spawn(async move {
            shared
                .drive_turn(message, language, level, mode, turn_timeout)
                .await
        });

        let report = match task.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Turn task failed");
                self.shared
                    .abort_turn(user_message, TurnAbort::Panicked, turn_timeout)
                    .await
            }
        };
        SubmitOutcome::Completed(Box::new(report))
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Switches the practiced language.
    ///
    /// A different language restarts the transcript with a new greeting.
    /// Feedback and stats are kept.
    pub async fn set_language(&self, language: Language) -> ConfigChange {
        let mut inner = self.shared.inner.lock().await;
        if inner.status.is_busy() {
            debug!(%language, "Language change rejected: turn in flight");
            return ConfigChange::Rejected(Rejection::Busy);
        }
        if inner.language == language {
            return ConfigChange::Unchanged;
        }
        inner.language = language;
        self.reset_transcript(&mut inner)
    }

    /// Switches the learner level, restarting the transcript if it changed.
    pub async fn set_level(&self, level: Level) -> ConfigChange {
        let mut inner = self.shared.inner.lock().await;
        if inner.status.is_busy() {
            debug!(%level, "Level change rejected: turn in flight");
            return ConfigChange::Rejected(Rejection::Busy);
        }
        if inner.level == level {
            return ConfigChange::Unchanged;
        }
        inner.level = level;
        self.reset_transcript(&mut inner)
    }

    fn reset_transcript(&self, inner: &mut Inner) -> ConfigChange {
        let text = greeting(inner.language, inner.level);
        let message = inner.transcript.reset_with(text);
        info!(
            language = %inner.language,
            level = %inner.level,
            "Transcript reset"
        );
        self.shared.events.send(SessionEvent::TranscriptReset {
            language: inner.language,
            level: inner.level,
            greeting: message.clone(),
        });
        ConfigChange::Applied(message)
    }

    /// Sets the conversation mode. Takes effect from the next submission.
    pub async fn set_mode(&self, mode: Mode) {
        self.shared.inner.lock().await.mode = mode;
        debug!(%mode, "Mode set");
    }

    /// Flips between casual and structured, returning the new mode.
    pub async fn toggle_mode(&self) -> Mode {
        let mut inner = self.shared.inner.lock().await;
        inner.mode = inner.mode.toggled();
        debug!(mode = %inner.mode, "Mode toggled");
        inner.mode
    }

    /// Appends the opening message for a quick practice session.
    ///
    /// No oracle call is made and stats are unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::Busy` while a turn is in flight.
    pub async fn start_quick_practice(&self, kind: PracticeKind) -> Result<Message, Rejection> {
        let message = {
            let mut inner = self.shared.inner.lock().await;
            if inner.status.is_busy() {
                return Err(Rejection::Busy);
            }
            inner.transcript.append(Role::Tutor, kind.opening_message())
        };
        debug!(?kind, "Quick practice started");
        self.shared.events
            .send(SessionEvent::MessageAppended(message.clone()));
        Ok(message)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the turn status.
    pub async fn status(&self) -> SessionStatus {
        self.shared.inner.lock().await.status
    }

    /// Returns a copy of the transcript messages.
    pub async fn transcript(&self) -> Vec<Message> {
        self.shared.inner.lock().await.transcript.messages().to_vec()
    }

    /// Returns the feedback from the most recent turn.
    pub async fn feedback(&self) -> Vec<FeedbackEvent> {
        self.shared.inner.lock().await.feedback.clone()
    }

    /// Returns the session statistics.
    pub async fn stats(&self) -> SessionStats {
        self.shared.inner.lock().await.stats
    }

    /// Returns the practiced language.
    pub async fn language(&self) -> Language {
        self.shared.inner.lock().await.language
    }

    /// Returns the learner level.
    pub async fn level(&self) -> Level {
        self.shared.inner.lock().await.level
    }

    /// Returns the conversation mode.
    pub async fn mode(&self) -> Mode {
        self.shared.inner.lock().await.mode
    }

    /// Returns the learning goals.
    pub async fn goals(&self) -> Vec<LearningGoal> {
        self.shared.inner.lock().await.goals.clone()
    }

    /// Returns a consistent copy of the whole session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.inner.lock().await;
        SessionSnapshot {
            status: inner.status,
            language: inner.language,
            level: inner.level,
            mode: inner.mode,
            messages: inner.transcript.messages().to_vec(),
            feedback: inner.feedback.clone(),
            stats: inner.stats,
            started_at: inner.started_at,
        }
    }
}

impl Shared {
    /// Runs the turn under the unwind guard and optional deadline, then
    /// commits its result.
    async fn drive_turn(
        &self,
        user_message: Message,
        language: Language,
        level: Level,
        mode: Mode,
        turn_timeout: Option<Duration>,
    ) -> TurnReport {
        let turn = AssertUnwindSafe(self.run_turn(&user_message.text, language, level, mode))
            .catch_unwind()
            .map(|result| result.map_err(|_| TurnAbort::Panicked));
        let result = match turn_timeout {
            Some(limit) => tokio::time::timeout(limit, turn)
                .await
                .unwrap_or(Err(TurnAbort::TimedOut)),
            None => turn.await,
        };

        match result {
            Ok((analysis, reply)) => self.finish_turn(user_message, analysis, reply).await,
            Err(abort) => self.abort_turn(user_message, abort, turn_timeout).await,
        }
    }

    /// Analysis, feedback and reply. The lock is only taken to publish feedback.
    async fn run_turn(
        &self,
        utterance: &str,
        language: Language,
        level: Level,
        mode: Mode,
    ) -> (Analysis, String) {
        let analysis = self.analyzer.analyze(utterance, language, level).await;

        let feedback = feedback::project(&analysis);
        self.inner.lock().await.feedback.clone_from(&feedback);
        self.events.send(SessionEvent::feedback_published(feedback));

        let reply = self
            .responder
            .respond(utterance, &analysis, language, level, mode)
            .await;
        (analysis, reply)
    }

    async fn finish_turn(&self, user_message: Message, analysis: Analysis, reply: String) -> TurnReport {
        let (tutor_message, stats, feedback) = {
            let mut inner = self.inner.lock().await;
            let tutor_message = inner.transcript.append(Role::Tutor, reply);
            let started_at = inner.started_at;
            inner
                .stats
                .record_turn(analysis.correction_count(), started_at, Utc::now());
            inner.status = SessionStatus::Idle;
            (tutor_message, inner.stats, inner.feedback.clone())
        };

        info!(
            message_count = stats.message_count,
            corrections = analysis.correction_count(),
            total_corrections = stats.grammar_correction_count,
            "Turn completed"
        );
        self.events
            .send(SessionEvent::MessageAppended(tutor_message.clone()));
        self.events.send(SessionEvent::StatsUpdated(stats));
        self.events.send(SessionEvent::turn_completed(false));

        TurnReport {
            user_message,
            tutor_message,
            analysis: Some(analysis),
            feedback,
            stats,
            degraded: false,
        }
    }

    async fn abort_turn(
        &self,
        user_message: Message,
        abort: TurnAbort,
        turn_timeout: Option<Duration>,
    ) -> TurnReport {
        match abort {
            TurnAbort::Panicked => error!("Turn panicked, continuing with fallback reply"),
            TurnAbort::TimedOut => warn!(
                timeout = ?turn_timeout,
                "Turn deadline expired, continuing with fallback reply"
            ),
        }

        let (tutor_message, stats, feedback) = {
            let mut inner = self.inner.lock().await;
            let tutor_message = inner.transcript.append(Role::Tutor, TURN_FALLBACK_REPLY);
            inner.status = SessionStatus::Idle;
            (tutor_message, inner.stats, inner.feedback.clone())
        };

        self.events
            .send(SessionEvent::MessageAppended(tutor_message.clone()));
        self.events.send(SessionEvent::turn_completed(true));

        TurnReport {
            user_message,
            tutor_message,
            analysis: None,
            feedback,
            stats,
            degraded: true,
        }
    }
}
