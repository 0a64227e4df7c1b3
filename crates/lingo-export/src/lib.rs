//! Lingo Calendar Export
//!
//! This crate turns a weekly practice plan into an iCalendar document that can
//! be imported into any calendar application. Each planned day becomes one
//! all-day event that repeats weekly.
//!
//! # Types
//!
//! - [`CalendarPlan`] - The language and the planned days to export
//! - [`PlannedDay`] - One weekday with its activity and tasks
//!
//! # Generators
//!
//! - [`CalendarGenerator`] - Render a plan as iCalendar text
//!
//! # Example
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc, Weekday};
//! use lingo_export::{CalendarGenerator, CalendarPlan, PlannedDay};
//!
//! let plan = CalendarPlan::new("English")
//!     .day(PlannedDay::new(Weekday::Mon, "class", ["Review mistakes", "Class at 3pm"]));
//!
//! let anchor = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
//! let generated_at = Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap();
//! let ics = CalendarGenerator::new(&plan).generate(anchor, generated_at).unwrap();
//!
//! assert!(ics.contains("SUMMARY:English class Practice"));
//! assert!(ics.contains("DTSTART;VALUE=DATE:20240304"));
//! ```

mod calendar;

pub use calendar::CalendarGenerator;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during calendar export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to write the calendar file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The plan cannot be rendered.
    #[error("invalid calendar data: {0}")]
    InvalidData(String),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

// ============================================================================
// Calendar Plan
// ============================================================================

/// A weekly practice plan ready for export.
///
/// This mirrors the scheduler's week without depending on the tutor crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPlan {
    /// Display name of the practiced language, used in event summaries.
    pub language: String,
    /// Planned days, in any order.
    pub days: Vec<PlannedDay>,
}

impl CalendarPlan {
    /// Creates an empty plan for `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            days: Vec::new(),
        }
    }

    /// Adds a planned day.
    #[must_use]
    pub fn day(mut self, day: PlannedDay) -> Self {
        self.days.push(day);
        self
    }

    /// Returns the planned days ordered Monday through Sunday.
    #[must_use]
    pub fn days_in_week_order(&self) -> Vec<&PlannedDay> {
        let mut days: Vec<&PlannedDay> = self.days.iter().collect();
        days.sort_by_key(|d| d.weekday.num_days_from_monday());
        days
    }

    /// Checks that the plan can be exported.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::InvalidData` if the language is blank or a
    /// weekday appears more than once.
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(ExportError::InvalidData(
                "language name must not be empty".to_string(),
            ));
        }

        let mut seen = [false; 7];
        for day in &self.days {
            let slot = &mut seen[day.weekday.num_days_from_monday() as usize];
            if *slot {
                return Err(ExportError::InvalidData(format!(
                    "{} is planned more than once",
                    day.weekday
                )));
            }
            *slot = true;
        }

        Ok(())
    }
}

/// One weekday of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDay {
    /// The weekday this entry repeats on.
    pub weekday: Weekday,
    /// Activity label, e.g. `class` or `speaking`.
    pub activity: String,
    /// Tasks in display order.
    pub tasks: Vec<String>,
}

impl PlannedDay {
    /// Creates a planned day.
    #[must_use]
    pub fn new<I, S>(weekday: Weekday, activity: impl Into<String>, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            weekday,
            activity: activity.into(),
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_days_in_week_order() {
        let plan = CalendarPlan::new("French")
            .day(PlannedDay::new(Weekday::Sun, "light", ["Relax"]))
            .day(PlannedDay::new(Weekday::Mon, "class", ["Class at 3pm"]))
            .day(PlannedDay::new(Weekday::Wed, "speaking", ["Record yourself"]));

        let order: Vec<Weekday> = plan.days_in_week_order().iter().map(|d| d.weekday).collect();
        assert_eq!(order, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
    }

    #[test]
    fn test_validate_rejects_duplicate_weekday() {
        let plan = CalendarPlan::new("German")
            .day(PlannedDay::new(Weekday::Tue, "grammar", ["Drill"]))
            .day(PlannedDay::new(Weekday::Tue, "review", ["Review"]));

        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_blank_language() {
        assert!(CalendarPlan::new("  ").validate().is_err());
        assert!(CalendarPlan::new("Italian").validate().is_ok());
    }

    #[test]
    fn test_plan_serialization() {
        let plan = CalendarPlan::new("Spanish")
            .day(PlannedDay::new(Weekday::Fri, "listening", ["Discuss"]));
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: CalendarPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }
}
