//! Configuration types for the Lingo tutor.
//!
//! This module provides the session configuration (target language,
//! proficiency level, conversation mode) and the settings for the language
//! oracle client.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "lingo.json";

/// Default Anthropic Messages API endpoint.
fn default_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

/// Default model used for analysis and replies.
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

/// Default environment variable holding the API key.
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

/// Default maximum tokens per oracle answer.
const fn default_max_tokens() -> u32 {
    1024
}

/// Default per-request timeout in seconds.
const fn default_oracle_timeout() -> u32 {
    60
}

/// Main configuration for a tutoring session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Language the learner is practicing.
    #[serde(default)]
    pub language: Language,

    /// The learner's proficiency level.
    #[serde(default)]
    pub level: Level,

    /// Conversation style passed to the tutor.
    #[serde(default)]
    pub mode: Mode,

    /// Optional deadline for a whole turn (analysis plus reply), in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_timeout_seconds: Option<u32>,

    /// Language oracle client settings.
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `lingo.json` in the current directory and falls back to the
    /// defaults when it is absent.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `lingo.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` if the file exists but contains
    /// invalid JSON or invalid enum values, and
    /// `TutorError::ConfigValidationError` if values are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TutorError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TutorError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.turn_timeout_seconds == Some(0) {
            return Err(TutorError::config_validation(
                "turnTimeoutSeconds must be greater than 0",
                "Remove turnTimeoutSeconds or set it to at least 1 in your lingo.json",
            ));
        }

        self.oracle.validate()
    }
}

/// Settings for the HTTP language oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleConfig {
    /// Messages API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum number of tokens the oracle may generate per answer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub timeout_seconds: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_oracle_timeout(),
        }
    }
}

impl OracleConfig {
    fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(TutorError::config_validation(
                "oracle.endpoint must not be empty",
                "Set oracle.endpoint to a Messages API URL in your lingo.json",
            ));
        }

        if self.model.trim().is_empty() {
            return Err(TutorError::config_validation(
                "oracle.model must not be empty",
                "Set oracle.model to a model identifier in your lingo.json",
            ));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(TutorError::config_validation(
                "oracle.apiKeyEnv must not be empty",
                "Set oracle.apiKeyEnv to the variable holding your key (e.g. ANTHROPIC_API_KEY)",
            ));
        }

        if self.max_tokens == 0 {
            return Err(TutorError::config_validation(
                "oracle.maxTokens must be greater than 0",
                "Set oracle.maxTokens to at least 1 in your lingo.json",
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(TutorError::config_validation(
                "oracle.timeoutSeconds must be greater than 0",
                "Set oracle.timeoutSeconds to at least 1 second in your lingo.json",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Language
// ============================================================================

/// Languages the tutor can teach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    /// English (default).
    #[default]
    English,
    /// Spanish.
    Spanish,
    /// French.
    French,
    /// German.
    German,
    /// Italian.
    Italian,
    /// Portuguese.
    Portuguese,
}

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Self; 6] = [
        Self::English,
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Italian,
        Self::Portuguese,
    ];

    /// Returns the English name of the language.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Italian => "Italian",
            Self::Portuguese => "Portuguese",
        }
    }

    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|language| language.name().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            format!(
                "invalid language '{s}': expected one of 'English', 'Spanish', 'French', 'German', 'Italian', 'Portuguese'"
            )
        })
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

// ============================================================================
// Level
// ============================================================================

/// CEFR proficiency level of the learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Beginner.
    A1,
    /// Elementary.
    A2,
    /// Intermediate (default).
    #[default]
    B1,
    /// Upper intermediate.
    B2,
    /// Advanced.
    C1,
    /// Proficient.
    C2,
}

impl Level {
    /// Every level, lowest first.
    pub const ALL: [Self; 6] = [Self::A1, Self::A2, Self::B1, Self::B2, Self::C1, Self::C2];

    /// Returns the CEFR code, e.g. `"B1"`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("invalid level '{s}': expected one of 'A1', 'A2', 'B1', 'B2', 'C1', 'C2'")
            })
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Level {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

// ============================================================================
// Mode
// ============================================================================

/// Conversation style requested from the tutor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Free-form conversation (default).
    #[default]
    Casual,
    /// Lesson-like, guided exchanges.
    Structured,
}

impl Mode {
    /// Returns the other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Casual => Self::Structured,
            Self::Structured => Self::Casual,
        }
    }

    /// Returns the wire name used in prompts and config files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "casual" => Ok(Self::Casual),
            "structured" => Ok(Self::Structured),
            _ => Err(format!(
                "invalid mode '{s}': expected one of 'casual', 'structured'"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
