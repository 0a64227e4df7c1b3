//! Weekly practice plan.
//!
//! The [`PracticeScheduler`] owns the weekly schedule, the set of checked
//! tasks and the practice streak. It is independent of the conversation: its
//! operations are synchronous and never touch session state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TutorError};

/// Streak a new scheduler starts with.
pub const SEED_STREAK: u32 = 5;

// ============================================================================
// Day
// ============================================================================

/// Day of the week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
    /// Sunday.
    Sunday,
}

impl Day {
    /// Monday through Sunday.
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Returns the full English name of the day.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Zero-based position in the week, Monday = 0.
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Converts from `chrono`'s weekday.
    #[must_use]
    pub const fn from_weekday(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }

    /// Converts to `chrono`'s weekday.
    #[must_use]
    pub const fn weekday(&self) -> chrono::Weekday {
        match self {
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
            Self::Sunday => chrono::Weekday::Sun,
        }
    }

    /// The current day in the local time zone.
    #[must_use]
    pub fn today() -> Self {
        Self::from_weekday(chrono::Local::now().weekday())
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = String;

    /// Accepts full names or three-letter abbreviations, case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|day| {
                day.name().eq_ignore_ascii_case(wanted)
                    || (wanted.len() == 3 && day.name()[..3].eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| format!("invalid day '{s}': expected a weekday such as 'Monday' or 'mon'"))
    }
}

// ============================================================================
// Activity and DaySchedule
// ============================================================================

/// Kind of practice planned for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// A scheduled class.
    Class,
    /// Grammar drills.
    Grammar,
    /// Speaking practice.
    Speaking,
    /// Listening and reading.
    Listening,
    /// Reviewing the week's mistakes.
    Review,
    /// A light day.
    Light,
}

impl Activity {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Grammar => "grammar",
            Self::Speaking => "speaking",
            Self::Listening => "listening",
            Self::Review => "review",
            Self::Light => "light",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Kind of practice.
    pub activity: Activity,
    /// Derived: every task of the day is checked.
    pub completed: bool,
    /// Tasks in display order.
    pub tasks: Vec<String>,
}

impl DaySchedule {
    /// Creates an uncompleted day plan.
    #[must_use]
    pub fn new(activity: Activity, tasks: &[&str]) -> Self {
        Self {
            activity,
            completed: false,
            tasks: tasks.iter().map(ToString::to_string).collect(),
        }
    }
}

/// The seven-day plan, keyed Monday through Sunday.
pub type WeeklySchedule = BTreeMap<Day, DaySchedule>;

/// The plan every new scheduler starts with.
#[must_use]
pub fn default_schedule() -> WeeklySchedule {
    [
        (
            Day::Monday,
            DaySchedule::new(
                Activity::Class,
                &["Review mistakes", "Class at 3pm", "Practice grammar"],
            ),
        ),
        (
            Day::Tuesday,
            DaySchedule::new(
                Activity::Grammar,
                &["Grammar focus - 30 mins", "Practice tenses", "Log mistakes"],
            ),
        ),
        (
            Day::Wednesday,
            DaySchedule::new(
                Activity::Speaking,
                &["Voice practice - 25 mins", "Record yourself", "Focus on fluency"],
            ),
        ),
        (
            Day::Thursday,
            DaySchedule::new(
                Activity::Class,
                &["Prepare questions", "Class at 3pm", "Clarify doubts"],
            ),
        ),
        (
            Day::Friday,
            DaySchedule::new(
                Activity::Listening,
                &["Watch content - 15 mins", "Read articles - 15 mins", "Discuss"],
            ),
        ),
        (
            Day::Saturday,
            DaySchedule::new(
                Activity::Review,
                &["Review mistakes", "Practice - 45 mins", "Fun activity"],
            ),
        ),
        (
            Day::Sunday,
            DaySchedule::new(
                Activity::Light,
                &["Casual chat - 15 mins", "Plan week", "Relax"],
            ),
        ),
    ]
    .into_iter()
    .collect()
}

// ============================================================================
// PracticeKind
// ============================================================================

/// Focus of a quick practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeKind {
    /// Grammar drills.
    Grammar,
    /// Vocabulary building.
    Vocabulary,
    /// Conversation practice.
    Speaking,
}

impl PracticeKind {
    /// The tutor message that opens this kind of practice.
    #[must_use]
    pub const fn opening_message(&self) -> &'static str {
        match self {
            Self::Grammar => "Let's practice grammar! I'll help you with past tenses.",
            Self::Vocabulary => "Time to learn new words! Let's expand your vocabulary.",
            Self::Speaking => "Speaking practice time! Let's have a conversation.",
        }
    }
}

impl FromStr for PracticeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grammar" => Ok(Self::Grammar),
            "vocabulary" | "vocab" => Ok(Self::Vocabulary),
            "speaking" => Ok(Self::Speaking),
            _ => Err(format!(
                "invalid practice kind '{s}': expected one of 'grammar', 'vocabulary', 'speaking'"
            )),
        }
    }
}

// ============================================================================
// PracticeScheduler
// ============================================================================

/// Owner of the weekly plan, the checked tasks and the streak.
#[derive(Debug, Clone)]
pub struct PracticeScheduler {
    schedule: WeeklySchedule,
    checked: BTreeSet<(Day, usize)>,
    streak: u32,
}

impl Default for PracticeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeScheduler {
    /// Creates a scheduler with the default plan and the seed streak.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schedule(default_schedule(), SEED_STREAK)
    }

    /// Creates a scheduler with a custom plan.
    ///
    /// Days missing from `schedule` get an empty light day so all seven keys
    /// are always present.
    #[must_use]
    pub fn with_schedule(mut schedule: WeeklySchedule, streak: u32) -> Self {
        for day in Day::ALL {
            schedule
                .entry(day)
                .or_insert_with(|| DaySchedule::new(Activity::Light, &[]));
        }
        let mut scheduler = Self {
            schedule,
            checked: BTreeSet::new(),
            streak,
        };
        for day in Day::ALL {
            scheduler.refresh(day);
        }
        scheduler
    }

    /// Checks or unchecks one task and returns whether the day is now complete.
    ///
    /// Toggling a task into the state it already has changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::TaskOutOfRange` if `task_index` is not one of the
    /// day's tasks.
    pub fn toggle_task(&mut self, day: Day, task_index: usize, completed: bool) -> Result<bool> {
        let len = self.day(day).tasks.len();
        if task_index >= len {
            return Err(TutorError::task_out_of_range(day, task_index, len));
        }

        if completed {
            self.checked.insert((day, task_index));
        } else {
            self.checked.remove(&(day, task_index));
        }

        let day_completed = self.refresh(day);
        debug!(%day, task_index, completed, day_completed, "Task toggled");
        Ok(day_completed)
    }

    /// Returns `true` if the task is checked.
    #[must_use]
    pub fn is_task_checked(&self, day: Day, task_index: usize) -> bool {
        self.checked.contains(&(day, task_index))
    }

    /// Returns `true` if every task of `day` is checked.
    #[must_use]
    pub fn is_completed(&self, day: Day) -> bool {
        self.day(day).completed
    }

    /// Returns the checked task indices for `day`, ascending.
    #[must_use]
    pub fn checked_tasks(&self, day: Day) -> Vec<usize> {
        self.checked
            .range((day, 0)..=(day, usize::MAX))
            .map(|&(_, index)| index)
            .collect()
    }

    /// Returns the plan for one day.
    #[must_use]
    pub fn day(&self, day: Day) -> &DaySchedule {
        // Every day is inserted on construction.
        &self.schedule[&day]
    }

    /// Returns the whole week, Monday first.
    #[must_use]
    pub const fn week(&self) -> &WeeklySchedule {
        &self.schedule
    }

    /// The current day in the local time zone.
    #[must_use]
    pub fn today() -> Day {
        Day::today()
    }

    /// Returns the current practice streak in days.
    #[must_use]
    pub const fn current_streak(&self) -> u32 {
        self.streak
    }

    /// Closes out `day`: the streak grows if all of its tasks were done and
    /// drops to zero otherwise. The day's checks are then cleared.
    ///
    /// Returns the new streak.
    pub fn close_day(&mut self, day: Day) -> u32 {
        self.streak = if self.is_completed(day) {
            self.streak.saturating_add(1)
        } else {
            0
        };
        self.checked.retain(|&(d, _)| d != day);
        self.refresh(day);
        debug!(%day, streak = self.streak, "Day closed");
        self.streak
    }

    /// Recomputes the derived `completed` flag of `day` from the checked set.
    fn refresh(&mut self, day: Day) -> bool {
        let checked = &self.checked;
        let Some(schedule) = self.schedule.get_mut(&day) else {
            return false;
        };
        schedule.completed = (0..schedule.tasks.len()).all(|i| checked.contains(&(day, i)));
        schedule.completed
    }
}
