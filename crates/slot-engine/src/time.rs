//! Wall-clock time of day and half-open time windows.
//!
//! Times are stored and exchanged as zero-padded `HH:MM` strings so that plain
//! string comparison and numeric comparison agree. No timezone is attached.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};

/// A wall-clock time with minute precision (`00:00` through `23:59`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(AvailabilityError::InvalidTime(format!(
                "{}:{:02} is out of range",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Minutes since midnight, the canonical comparable form.
    pub fn to_minutes(self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        parse_time(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AvailabilityError;

    fn try_from(s: String) -> Result<Self> {
        parse_time(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

/// Parse a 24-hour `H:MM` or `HH:MM` string.
///
/// # Errors
/// Returns `AvailabilityError::InvalidTime` for anything else, including hours
/// above 23, minutes above 59, single-digit minutes and stray whitespace.
pub fn parse_time(s: &str) -> Result<TimeOfDay> {
    let invalid = || AvailabilityError::InvalidTime(format!("expected H:MM or HH:MM, got '{}'", s));

    let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 {
        return Err(invalid());
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u8 = hours.parse().map_err(|_| invalid())?;
    let minute: u8 = minutes.parse().map_err(|_| invalid())?;
    TimeOfDay::new(hour, minute)
}

/// Minutes since midnight.
pub fn to_minutes(time: TimeOfDay) -> u32 {
    time.to_minutes()
}

/// Half-open overlap test: `[a_start, a_end)` and `[b_start, b_end)` share at
/// least one minute. Windows that only touch at a boundary do not overlap.
pub fn intervals_overlap(
    a_start: TimeOfDay,
    a_end: TimeOfDay,
    b_start: TimeOfDay,
    b_end: TimeOfDay,
) -> bool {
    a_start.to_minutes() < b_end.to_minutes() && b_start.to_minutes() < a_end.to_minutes()
}

/// Render a time in the 12-hour `h:mm AM/PM` form (`00:05` → `12:05 AM`).
pub fn format_display(time: TimeOfDay) -> String {
    let (display_hour, suffix) = match time.hour {
        0 => (12, "AM"),
        h @ 1..=11 => (h, "AM"),
        12 => (12, "PM"),
        h => (h - 12, "PM"),
    };
    format!("{}:{:02} {}", display_hour, time.minute, suffix)
}

/// Parse a 12-hour `h:mm AM/PM` string back into a 24-hour time.
///
/// `12:xx AM` maps to `00:xx`, `12:xx PM` stays `12:xx`, any other PM hour gets
/// twelve added. The meridiem is matched case-insensitively.
///
/// # Errors
/// Returns `AvailabilityError::InvalidTime` if the clock part is malformed, the
/// hour is outside `1..=12`, or the meridiem is neither `AM` nor `PM`.
pub fn to_24_hour(display: &str) -> Result<TimeOfDay> {
    let invalid = || AvailabilityError::InvalidTime(format!("expected h:mm AM/PM, got '{}'", display));

    let mut parts = display.split_whitespace();
    let (clock, meridiem) = match (parts.next(), parts.next(), parts.next()) {
        (Some(clock), Some(meridiem), None) => (clock, meridiem),
        _ => return Err(invalid()),
    };

    let parsed = parse_time(clock).map_err(|_| invalid())?;
    if !(1..=12).contains(&parsed.hour) {
        return Err(invalid());
    }

    let hour = match (meridiem.to_ascii_uppercase().as_str(), parsed.hour) {
        ("AM", 12) => 0,
        ("AM", h) => h,
        ("PM", 12) => 12,
        ("PM", h) => h + 12,
        _ => return Err(invalid()),
    };
    TimeOfDay::new(hour, parsed.minute)
}

/// The values offered by the time pickers: `6:00 AM` through `10:30 PM` in
/// half-hour steps.
pub fn time_options() -> Vec<String> {
    (6u8..=22)
        .flat_map(|hour| [0u8, 30].map(move |minute| TimeOfDay { hour, minute }))
        .map(format_display)
        .collect()
}

/// A validated `[start, end)` window within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    /// # Errors
    /// Returns `AvailabilityError::Validation` unless `start < end`.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        if start >= end {
            return Err(AvailabilityError::Validation(format!(
                "end time {} must be after start time {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        intervals_overlap(self.start, self.end, other.start, other.end)
    }

    /// Length of the shared part of two windows, zero when they do not overlap.
    pub fn overlap_minutes(&self, other: &TimeWindow) -> u32 {
        let start = self.start.max(other.start).to_minutes();
        let end = self.end.min(other.end).to_minutes();
        end.saturating_sub(start)
    }

    /// True when `other` lies entirely within this window.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end.to_minutes() - self.start.to_minutes()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", format_display(self.start), format_display(self.end))
    }
}
