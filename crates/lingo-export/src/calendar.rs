//! iCalendar rendering for weekly practice plans.
//!
//! This module provides the [`CalendarGenerator`] struct for converting a
//! [`CalendarPlan`] into an RFC 5545 document. The generated calendar has:
//!
//! - One all-day `VEVENT` per planned day, Monday first
//! - A `DTSTART` on that weekday within the week of the anchor date
//! - A weekly `RRULE` so the plan repeats
//! - CRLF line endings, escaped TEXT values and folded long lines

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use crate::{CalendarPlan, ExportError, PlannedDay, Result};

/// Product identifier written to every calendar.
const PRODUCT_ID: &str = "-//Lingo//Practice Plan//EN";

/// Maximum content line length in octets, excluding the CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// Generates iCalendar documents from a practice plan.
pub struct CalendarGenerator<'a> {
    plan: &'a CalendarPlan,
}

impl<'a> CalendarGenerator<'a> {
    /// Creates a new generator for the given plan.
    #[must_use]
    pub const fn new(plan: &'a CalendarPlan) -> Self {
        Self { plan }
    }

    /// Renders the plan.
    ///
    /// Events start in the Monday-to-Sunday week containing `anchor`.
    /// `generated_at` stamps every event and seeds its `UID`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::InvalidData` if the plan fails validation or the
    /// event dates fall outside the supported calendar range.
    pub fn generate(&self, anchor: NaiveDate, generated_at: DateTime<Utc>) -> Result<String> {
        self.plan.validate()?;

        let week_start = anchor
            .checked_sub_days(Days::new(u64::from(anchor.weekday().num_days_from_monday())))
            .ok_or_else(|| out_of_range(anchor))?;
        let stamp = generated_at.timestamp_millis();
        let dtstamp = generated_at.format("%Y%m%dT%H%M%SZ").to_string();

        let mut output = String::new();
        push_line(&mut output, "BEGIN:VCALENDAR");
        push_line(&mut output, "VERSION:2.0");
        push_line(&mut output, &format!("PRODID:{PRODUCT_ID}"));
        push_line(&mut output, "CALSCALE:GREGORIAN");

        for (index, day) in self.plan.days_in_week_order().into_iter().enumerate() {
            let date = week_start
                .checked_add_days(Days::new(u64::from(day.weekday.num_days_from_monday())))
                .ok_or_else(|| out_of_range(anchor))?;
            self.write_event(&mut output, day, date, &format!("{stamp}-{index}"), &dtstamp);
        }

        push_line(&mut output, "END:VCALENDAR");
        Ok(output)
    }

    /// Renders the plan and writes it to `path`.
    pub fn write_to_file(
        &self,
        path: &Path,
        anchor: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Result<()> {
        let ics = self.generate(anchor, generated_at)?;

        let mut file = File::create(path)?;
        file.write_all(ics.as_bytes())?;

        Ok(())
    }

    fn write_event(
        &self,
        output: &mut String,
        day: &PlannedDay,
        date: NaiveDate,
        uid: &str,
        dtstamp: &str,
    ) {
        let summary = format!("{} {} Practice", self.plan.language, day.activity);
        let description = day.tasks.join(", ");

        push_line(output, "BEGIN:VEVENT");
        push_line(output, &format!("UID:{uid}"));
        push_line(output, &format!("DTSTAMP:{dtstamp}"));
        push_line(output, &format!("DTSTART;VALUE=DATE:{}", date.format("%Y%m%d")));
        push_line(output, "RRULE:FREQ=WEEKLY");
        push_line(output, &format!("SUMMARY:{}", escape_text(&summary)));
        push_line(output, &format!("DESCRIPTION:{}", escape_text(&description)));
        push_line(output, "END:VEVENT");
    }
}

fn out_of_range(anchor: NaiveDate) -> ExportError {
    ExportError::InvalidData(format!("week of {anchor} is outside the supported date range"))
}

/// Appends one content line, folded and terminated with CRLF.
fn push_line(output: &mut String, line: &str) {
    let mut octets = 0;
    for ch in line.chars() {
        if octets + ch.len_utf8() > MAX_LINE_OCTETS {
            output.push_str("\r\n ");
            // The leading space counts towards the continuation line
            octets = 1;
        }
        output.push(ch);
        octets += ch.len_utf8();
    }
    output.push_str("\r\n");
}

/// Escapes a TEXT property value.
fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '\\' | ';' | ',' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("\\n"),
            '\r' => {}
            _ => result.push(ch),
        }
    }

    result
}
