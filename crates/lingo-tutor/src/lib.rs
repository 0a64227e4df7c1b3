//! Lingo Tutor
//!
//! Conversation session manager for AI language tutoring: analysis and reply
//! pipeline over a language oracle, feedback projection, session statistics
//! and the weekly practice scheduler.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod events;
pub mod feedback;
pub mod goals;
pub mod oracle;
pub mod responder;
pub mod scheduler;
pub mod session;
pub mod state;

pub use analyzer::{analysis_prompt, Analysis, GrammarError, UtteranceAnalyzer};
pub use config::{Config, Language, Level, Mode, OracleConfig};
pub use error::{Result, TransportKind, TutorError};
pub use events::{EventBroadcaster, SessionEvent};
pub use feedback::FeedbackEvent;
pub use goals::{default_goals, LearningGoal};
pub use oracle::{ClaudeOracle, Oracle, ScriptedAnswer, ScriptedOracle};
pub use responder::{reply_prompt, TutorResponder, FALLBACK_REPLY};
pub use scheduler::{
    default_schedule, Activity, Day, DaySchedule, PracticeKind, PracticeScheduler, WeeklySchedule,
};
pub use session::{
    greeting, ConfigChange, Rejection, SessionManager, SubmitOutcome, TurnReport,
    TURN_FALLBACK_REPLY,
};
pub use state::{Message, Role, SessionSnapshot, SessionStats, SessionStatus, Transcript};
