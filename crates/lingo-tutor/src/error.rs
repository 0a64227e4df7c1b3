//! Error types for the Lingo tutor.
//!
//! This module defines the error hierarchy for configuration loading, oracle
//! calls, analysis parsing and practice scheduling. Oracle and parse failures
//! are absorbed by the analyzer and responder fallbacks; they only surface to
//! callers that use the oracle directly.

use std::path::PathBuf;

/// A specialized `Result` type for Lingo tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Errors that can occur while running a tutoring session.
///
/// Variants carry actionable suggestions where the user can do something
/// about the failure.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax or values in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your lingo.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Oracle Errors
    // ========================================================================
    /// The oracle call failed before a usable answer came back.
    #[error("Oracle request failed ({kind}): {message}\n\nSuggestion: {suggestion}")]
    OracleTransport {
        /// The kind of transport failure.
        kind: TransportKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The oracle answered, but the analysis could not be parsed.
    #[error("Oracle returned a malformed analysis: {message}")]
    OracleParse {
        /// Description of the parse failure.
        message: String,
    },

    /// The environment variable holding the oracle API key is not set.
    #[error("API key not found in environment variable '{var}'\n\nSuggestion: Export {var} or run with --offline")]
    MissingApiKey {
        /// Name of the environment variable that was checked.
        var: String,
    },

    // ========================================================================
    // Practice Schedule Errors
    // ========================================================================
    /// A task index does not exist for the given day.
    #[error("{day} has {len} tasks; task index {index} is out of range")]
    TaskOutOfRange {
        /// Day the task was addressed on.
        day: String,
        /// The requested task index.
        index: usize,
        /// Number of tasks scheduled that day.
        len: usize,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Categories of oracle transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Authentication failure (invalid API key, expired credentials).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// The call did not finish before its deadline.
    Timeout,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl TransportKind {
    /// Returns a suggestion message for this failure kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check your API key or credentials",
            Self::RateLimit => "Slow down; the provider is rate limiting requests",
            Self::Server => "The language service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Timeout => "Raise oracle.timeoutSeconds in lingo.json",
            Self::Other => "Check the language service's status page",
        }
    }
}

impl TutorError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `OracleTransport` error with a suggestion derived from the kind.
    #[must_use]
    pub fn oracle_transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Self::OracleTransport {
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a new `OracleParse` error.
    #[must_use]
    pub fn oracle_parse(message: impl Into<String>) -> Self {
        Self::OracleParse {
            message: message.into(),
        }
    }

    /// Creates a new `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(var: impl Into<String>) -> Self {
        Self::MissingApiKey { var: var.into() }
    }

    /// Creates a new `TaskOutOfRange` error.
    #[must_use]
    pub fn task_out_of_range(day: impl std::fmt::Display, index: usize, len: usize) -> Self {
        Self::TaskOutOfRange {
            day: day.to_string(),
            index,
            len,
        }
    }

    /// Returns `true` if this error is an oracle failure that a later call may not hit.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::OracleTransport {
                kind: TransportKind::RateLimit
                    | TransportKind::Server
                    | TransportKind::Network
                    | TransportKind::Timeout,
                ..
            }
        )
    }

    /// Returns `true` if this error came from the oracle boundary.
    #[must_use]
    pub const fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            Self::OracleTransport { .. } | Self::OracleParse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = TutorError::missing_api_key("ANTHROPIC_API_KEY");
        let msg = err.to_string();
        assert!(msg.contains("ANTHROPIC_API_KEY"));
        assert!(msg.contains("Suggestion"));
        assert!(msg.contains("--offline"));
    }

    #[test]
    fn test_transport_kind_display() {
        assert_eq!(TransportKind::RateLimit.to_string(), "rate_limit");
        assert_eq!(TransportKind::Authentication.to_string(), "authentication");
        assert_eq!(TransportKind::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_oracle_transport_carries_suggestion() {
        let err = TutorError::oracle_transport(TransportKind::Network, "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("network"));
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("Check your network connection"));
    }

    #[test]
    fn test_is_transient() {
        let rate_limit = TutorError::oracle_transport(TransportKind::RateLimit, "slow down");
        assert!(rate_limit.is_transient());

        let timeout = TutorError::oracle_transport(TransportKind::Timeout, "deadline");
        assert!(timeout.is_transient());

        let auth = TutorError::oracle_transport(TransportKind::Authentication, "bad key");
        assert!(!auth.is_transient());

        let parse = TutorError::oracle_parse("expected value");
        assert!(!parse.is_transient());
    }

    #[test]
    fn test_is_oracle_failure() {
        assert!(TutorError::oracle_parse("eof").is_oracle_failure());
        assert!(TutorError::oracle_transport(TransportKind::Other, "x").is_oracle_failure());
        assert!(!TutorError::task_out_of_range("Monday", 5, 3).is_oracle_failure());
    }

    #[test]
    fn test_task_out_of_range_display() {
        let err = TutorError::task_out_of_range("Monday", 7, 3);
        let msg = err.to_string();
        assert!(msg.contains("Monday"));
        assert!(msg.contains("index 7"));
        assert!(msg.contains("3 tasks"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TutorError = io_err.into();
        assert!(matches!(err, TutorError::Io(_)));
    }
}
