//! Detect time-overlap conflicts between a new listing and a teacher's existing
//! commitments.
//!
//! Windows are half-open: a lesson ending at 10:00 does not conflict with one
//! starting at 10:00. With [`ConflictScope::SameSkill`] only listings of the same
//! sport are compared.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::model::{day_of_week, ExclusionIndex, NewRecurrenceRule, NewSlot, RecurrenceRule, Skill, Slot};
use crate::time::{TimeOfDay, TimeWindow};

/// Which pairs of overlapping windows count as a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictScope {
    /// Any two overlapping windows of the same teacher.
    #[default]
    #[serde(alias = "any")]
    AnyOverlap,
    /// Only overlapping windows of the same sport.
    SameSkill,
}

impl std::str::FromStr for ConflictScope {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any-overlap" => Ok(ConflictScope::AnyOverlap),
            "same-skill" => Ok(ConflictScope::SameSkill),
            other => Err(AvailabilityError::Validation(format!(
                "unknown conflict scope '{}' (expected any or same-skill)",
                other
            ))),
        }
    }
}

/// Knobs of the conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConflictPolicy {
    pub scope: ConflictScope,
    /// Also compare a new recurrence rule against the teacher's single
    /// listings that fall on its weekday inside its date range.
    pub check_singles_against_rules: bool,
}

impl ConflictPolicy {
    pub fn with_scope(scope: ConflictScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    fn compares(&self, a: Skill, b: Skill) -> bool {
        self.scope == ConflictScope::AnyOverlap || a == b
    }
}

/// The listing being proposed.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Single {
        teacher_id: String,
        date: NaiveDate,
        window: TimeWindow,
        skill: Skill,
    },
    Recurring {
        teacher_id: String,
        day_of_week: Weekday,
        window: TimeWindow,
        skill: Skill,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

impl From<&NewSlot> for Candidate {
    fn from(slot: &NewSlot) -> Self {
        Candidate::Single {
            teacher_id: slot.teacher_id.clone(),
            date: slot.date,
            window: TimeWindow {
                start: slot.start_time,
                end: slot.end_time,
            },
            skill: slot.skill,
        }
    }
}

impl From<&NewRecurrenceRule> for Candidate {
    fn from(rule: &NewRecurrenceRule) -> Self {
        Candidate::Recurring {
            teacher_id: rule.teacher_id.clone(),
            day_of_week: rule.day_of_week,
            window: TimeWindow {
                start: rule.start_time,
                end: rule.end_time,
            },
            skill: rule.skill,
            start_date: rule.start_date,
            end_date: rule.end_date,
        }
    }
}

/// The existing commitment a candidate collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConflictingEntry {
    Single {
        id: String,
        date: NaiveDate,
    },
    Recurring {
        #[serde(rename = "ruleId")]
        rule_id: String,
        #[serde(rename = "dayOfWeek", with = "day_of_week")]
        day_of_week: Weekday,
    },
    /// Another entry of the same, not yet saved, batch (zero-based position).
    Draft {
        index: usize,
        #[serde(rename = "dayOfWeek", with = "day_of_week")]
        day_of_week: Weekday,
    },
}

/// A detected overlap, described by the existing window it collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub existing: ConflictingEntry,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub skill: Skill,
    pub overlap_minutes: u32,
}

impl Conflict {
    fn new(existing: ConflictingEntry, window: TimeWindow, skill: Skill, candidate: &TimeWindow) -> Self {
        Self {
            existing,
            start_time: window.start,
            end_time: window.end,
            skill,
            overlap_minutes: window.overlap_minutes(candidate),
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.existing {
            ConflictingEntry::Single { date, .. } => write!(
                f,
                "overlaps the existing {} listing {} on {}",
                self.skill,
                self.window(),
                date
            ),
            ConflictingEntry::Recurring { day_of_week, .. } => write!(
                f,
                "overlaps the existing {} availability {} every {}",
                self.skill,
                self.window(),
                weekday_name(*day_of_week)
            ),
            ConflictingEntry::Draft { index, day_of_week } => write!(
                f,
                "overlaps availability #{} ({} {} on {})",
                index + 1,
                self.skill,
                self.window(),
                weekday_name(*day_of_week)
            ),
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Find every existing commitment of the candidate's teacher that it overlaps.
///
/// - A single candidate on date D is compared with the single listings on D and
///   with every rule that produces an instance on D (its weekday matches, D is in
///   its date range, D is not excluded).
/// - A recurring candidate is compared with the rules on the same weekday. Date
///   ranges of the two rules are not compared. Single listings are only checked
///   when `policy.check_singles_against_rules` is set.
///
/// Results follow the order of `singles`, then `rules`.
pub fn find_conflicts(
    candidate: &Candidate,
    singles: &[Slot],
    rules: &[RecurrenceRule],
    exclusions: &ExclusionIndex,
    policy: ConflictPolicy,
) -> Vec<Conflict> {
    match candidate {
        Candidate::Single {
            teacher_id,
            date,
            window,
            skill,
        } => {
            let single_hits = singles
                .iter()
                .filter(|s| &s.teacher_id == teacher_id && s.date == *date)
                .filter(|s| policy.compares(s.skill, *skill) && s.window().overlaps(window))
                .map(|s| {
                    let existing = ConflictingEntry::Single {
                        id: s.id.clone(),
                        date: s.date,
                    };
                    Conflict::new(existing, s.window(), s.skill, window)
                });
            let rule_hits = rules
                .iter()
                .filter(|r| &r.teacher_id == teacher_id && r.occurs_on(*date))
                .filter(|r| !exclusions.contains(&r.id, *date))
                .filter(|r| policy.compares(r.skill, *skill) && r.window().overlaps(window))
                .map(|r| {
                    let existing = ConflictingEntry::Recurring {
                        rule_id: r.id.clone(),
                        day_of_week: r.day_of_week,
                    };
                    Conflict::new(existing, r.window(), r.skill, window)
                });
            single_hits.chain(rule_hits).collect()
        }
        Candidate::Recurring {
            teacher_id,
            day_of_week,
            window,
            skill,
            start_date,
            end_date,
        } => {
            let single_hits = singles
                .iter()
                .filter(|_| policy.check_singles_against_rules)
                .filter(|s| &s.teacher_id == teacher_id && s.date.weekday() == *day_of_week)
                .filter(|s| *start_date <= s.date && s.date <= *end_date)
                .filter(|s| policy.compares(s.skill, *skill) && s.window().overlaps(window))
                .map(|s| {
                    let existing = ConflictingEntry::Single {
                        id: s.id.clone(),
                        date: s.date,
                    };
                    Conflict::new(existing, s.window(), s.skill, window)
                });
            let rule_hits = rules
                .iter()
                .filter(|r| &r.teacher_id == teacher_id && r.day_of_week == *day_of_week)
                .filter(|r| policy.compares(r.skill, *skill) && r.window().overlaps(window))
                .map(|r| {
                    let existing = ConflictingEntry::Recurring {
                        rule_id: r.id.clone(),
                        day_of_week: r.day_of_week,
                    };
                    Conflict::new(existing, r.window(), r.skill, window)
                });
            single_hits.chain(rule_hits).collect()
        }
    }
}

/// Like [`find_conflicts`] but fails with the first conflict found.
///
/// # Errors
/// Returns `AvailabilityError::Conflict` carrying the first overlapping window.
pub fn ensure_no_conflict(
    candidate: &Candidate,
    singles: &[Slot],
    rules: &[RecurrenceRule],
    exclusions: &ExclusionIndex,
    policy: ConflictPolicy,
) -> Result<()> {
    match find_conflicts(candidate, singles, rules, exclusions, policy)
        .into_iter()
        .next()
    {
        Some(conflict) => Err(AvailabilityError::Conflict(conflict)),
        None => Ok(()),
    }
}

/// Check the entries of an unsaved batch against each other.
///
/// Returns the position of the first entry that overlaps an earlier entry on the
/// same weekday, together with that conflict.
pub fn find_batch_conflict(
    drafts: &[NewRecurrenceRule],
    policy: ConflictPolicy,
) -> Option<(usize, Conflict)> {
    drafts.iter().enumerate().find_map(|(index, draft)| {
        let window = TimeWindow {
            start: draft.start_time,
            end: draft.end_time,
        };
        drafts[..index]
            .iter()
            .enumerate()
            .find(|(_, earlier)| {
                earlier.teacher_id == draft.teacher_id
                    && earlier.day_of_week == draft.day_of_week
                    && policy.compares(earlier.skill, draft.skill)
                    && TimeWindow {
                        start: earlier.start_time,
                        end: earlier.end_time,
                    }
                    .overlaps(&window)
            })
            .map(|(earlier_index, earlier)| {
                let existing = ConflictingEntry::Draft {
                    index: earlier_index,
                    day_of_week: earlier.day_of_week,
                };
                let earlier_window = TimeWindow {
                    start: earlier.start_time,
                    end: earlier.end_time,
                };
                (index, Conflict::new(existing, earlier_window, earlier.skill, &window))
            })
    })
}
