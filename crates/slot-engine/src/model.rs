//! Persisted records (single listings, recurrence rules, exclusions) and the
//! browseable [`Listing`] that both kinds are turned into.
//!
//! Field names serialize in camelCase to match the documents held by the store.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::time::{TimeOfDay, TimeWindow};

/// The sport a lesson is offered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Snowboarding,
    Skiing,
}

impl Skill {
    pub fn as_str(self) -> &'static str {
        match self {
            Skill::Snowboarding => "snowboarding",
            Skill::Skiing => "skiing",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Skill {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowboarding" => Ok(Skill::Snowboarding),
            "skiing" => Ok(Skill::Skiing),
            other => Err(AvailabilityError::Validation(format!(
                "unknown skill '{}' (expected snowboarding or skiing)",
                other
            ))),
        }
    }
}

/// Map a `0 = Sunday .. 6 = Saturday` index onto a weekday.
///
/// # Errors
/// Returns `AvailabilityError::Validation` for indices above 6.
pub fn weekday_from_index(index: u8) -> Result<Weekday> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(AvailabilityError::Validation(format!(
            "day of week must be 0 (Sunday) through 6 (Saturday), got {}",
            other
        ))),
    }
}

/// Serialize a [`Weekday`] as its Sunday-based index.
pub mod day_of_week {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(day.num_days_from_sunday() as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let index = u8::deserialize(deserializer)?;
        super::weekday_from_index(index).map_err(de::Error::custom)
    }
}

/// Validate a price typed in by the user.
///
/// # Errors
/// Returns `AvailabilityError::Validation` unless the input is a finite number
/// greater than zero.
pub fn parse_price(input: &str) -> Result<f64> {
    let price: f64 = input
        .trim()
        .parse()
        .map_err(|_| AvailabilityError::Validation(format!("invalid price '{}'", input)))?;
    validate_price(price)?;
    Ok(price)
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AvailabilityError::Validation(format!(
            "price must be a positive number, got {}",
            price
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AvailabilityError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// A standalone, persisted single listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub teacher_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub location: String,
    pub price: f64,
    pub skill: Skill,
}

impl Slot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// A single listing that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    pub teacher_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub location: String,
    pub price: f64,
    pub skill: Skill,
}

impl NewSlot {
    /// # Errors
    /// Returns `AvailabilityError::Validation` for a blank teacher or location, a
    /// non-positive price, or an end time not after the start time.
    pub fn validate(&self) -> Result<TimeWindow> {
        require("teacher id", &self.teacher_id)?;
        require("location", &self.location)?;
        validate_price(self.price)?;
        TimeWindow::new(self.start_time, self.end_time)
    }

    pub fn into_slot(self, id: String) -> Slot {
        Slot {
            id,
            teacher_id: self.teacher_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            location: self.location,
            price: self.price,
            skill: self.skill,
        }
    }
}

/// "Every `day_of_week` from `start_time` to `end_time`, between `start_date`
/// and `end_date` inclusive."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub id: String,
    pub teacher_id: String,
    #[serde(with = "day_of_week")]
    pub day_of_week: Weekday,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub price: f64,
    pub skill: Skill,
}

impl RecurrenceRule {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// True when `date` is a weekday of this rule inside its date range.
    /// Exclusions are not consulted.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        date.weekday() == self.day_of_week && self.start_date <= date && date <= self.end_date
    }
}

/// A recurrence rule that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurrenceRule {
    pub teacher_id: String,
    #[serde(with = "day_of_week")]
    pub day_of_week: Weekday,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub price: f64,
    pub skill: Skill,
}

impl NewRecurrenceRule {
    /// # Errors
    /// Same checks as [`NewSlot::validate`], plus `start_date <= end_date`.
    pub fn validate(&self) -> Result<TimeWindow> {
        require("teacher id", &self.teacher_id)?;
        require("location", &self.location)?;
        validate_price(self.price)?;
        if self.start_date > self.end_date {
            return Err(AvailabilityError::Validation(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        TimeWindow::new(self.start_time, self.end_time)
    }

    pub fn into_rule(self, id: String) -> RecurrenceRule {
        RecurrenceRule {
            id,
            teacher_id: self.teacher_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            price: self.price,
            skill: self.skill,
        }
    }
}

/// One entry of a recurring-availability batch: a weekday, a window and a sport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringDraft {
    #[serde(with = "day_of_week")]
    pub day_of_week: Weekday,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub skill: Skill,
}

/// Several weekly availabilities sharing a location, a price and a duration
/// counted in months from the day the batch is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringBatch {
    pub teacher_id: String,
    pub location: String,
    pub price: f64,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub months: Option<u32>,
    pub drafts: Vec<RecurringDraft>,
}

impl RecurringBatch {
    /// Turn every draft into a rule running from `today` for `months` months.
    ///
    /// # Errors
    /// Returns `AvailabilityError::Validation` for an empty batch or when the end
    /// date cannot be represented.
    pub fn into_rules(self, today: NaiveDate, months: u32) -> Result<Vec<NewRecurrenceRule>> {
        if self.drafts.is_empty() {
            return Err(AvailabilityError::Validation(
                "at least one availability is required".to_string(),
            ));
        }
        let end_date = today
            .checked_add_months(chrono::Months::new(months))
            .ok_or_else(|| {
                AvailabilityError::Validation(format!("{} months from {} is out of range", months, today))
            })?;

        Ok(self
            .drafts
            .into_iter()
            .map(|draft| NewRecurrenceRule {
                teacher_id: self.teacher_id.clone(),
                day_of_week: draft.day_of_week,
                start_time: draft.start_time,
                end_time: draft.end_time,
                start_date: today,
                end_date,
                location: self.location.clone(),
                price: self.price,
                skill: draft.skill,
            })
            .collect())
    }
}

/// A date on which a rule must not produce an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    #[serde(rename = "recurrenceRuleId")]
    pub rule_id: String,
    pub date: NaiveDate,
}

/// Excluded dates grouped by rule id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionIndex {
    by_rule: HashMap<String, BTreeSet<NaiveDate>>,
}

impl ExclusionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the pair was already present.
    pub fn insert(&mut self, rule_id: impl Into<String>, date: NaiveDate) -> bool {
        self.by_rule.entry(rule_id.into()).or_default().insert(date)
    }

    pub fn remove(&mut self, rule_id: &str, date: NaiveDate) -> bool {
        let Some(dates) = self.by_rule.get_mut(rule_id) else {
            return false;
        };
        let removed = dates.remove(&date);
        if dates.is_empty() {
            self.by_rule.remove(rule_id);
        }
        removed
    }

    pub fn contains(&self, rule_id: &str, date: NaiveDate) -> bool {
        self.by_rule
            .get(rule_id)
            .is_some_and(|dates| dates.contains(&date))
    }

    pub fn dates_for(&self, rule_id: &str) -> Option<&BTreeSet<NaiveDate>> {
        self.by_rule.get(rule_id)
    }

    pub fn len(&self) -> usize {
        self.by_rule.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_rule.is_empty()
    }
}

impl Extend<Exclusion> for ExclusionIndex {
    fn extend<I: IntoIterator<Item = Exclusion>>(&mut self, iter: I) {
        for exclusion in iter {
            self.insert(exclusion.rule_id, exclusion.date);
        }
    }
}

impl FromIterator<Exclusion> for ExclusionIndex {
    fn from_iter<I: IntoIterator<Item = Exclusion>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl<'a> FromIterator<&'a Exclusion> for ExclusionIndex {
    fn from_iter<I: IntoIterator<Item = &'a Exclusion>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

/// Where a [`Listing`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListingOrigin {
    /// A stored single listing.
    Single { id: String },
    /// An instance generated from a recurrence rule.
    Recurring {
        #[serde(rename = "ruleId")]
        rule_id: String,
    },
}

/// A bookable window on one date, whether stored directly or derived from a
/// recurrence rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub origin: ListingOrigin,
    pub teacher_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub location: String,
    pub price: f64,
    pub skill: Skill,
}

impl Listing {
    /// Instance of `rule` on `date`. The caller is responsible for `date`
    /// actually being one of the rule's occurrences.
    pub fn from_rule(rule: &RecurrenceRule, date: NaiveDate) -> Self {
        Self {
            origin: ListingOrigin::Recurring {
                rule_id: rule.id.clone(),
            },
            teacher_id: rule.teacher_id.clone(),
            date,
            start_time: rule.start_time,
            end_time: rule.end_time,
            location: rule.location.clone(),
            price: rule.price,
            skill: rule.skill,
        }
    }

    /// Stable key for UIs: the stored id, or `"{ruleId}-{YYYY-MM-DD}"` for
    /// derived instances. Never parse it back; use [`Listing::listing_ref`].
    pub fn display_id(&self) -> String {
        match &self.origin {
            ListingOrigin::Single { id } => id.clone(),
            ListingOrigin::Recurring { rule_id } => format!("{}-{}", rule_id, self.date),
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.origin, ListingOrigin::Recurring { .. })
    }

    pub fn rule_id(&self) -> Option<&str> {
        match &self.origin {
            ListingOrigin::Recurring { rule_id } => Some(rule_id),
            ListingOrigin::Single { .. } => None,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn listing_ref(&self) -> ListingRef {
        match &self.origin {
            ListingOrigin::Single { id } => ListingRef::Single { id: id.clone() },
            ListingOrigin::Recurring { rule_id } => ListingRef::Derived {
                rule_id: rule_id.clone(),
                date: self.date,
            },
        }
    }
}

impl From<Slot> for Listing {
    fn from(slot: Slot) -> Self {
        Self {
            origin: ListingOrigin::Single { id: slot.id },
            teacher_id: slot.teacher_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            location: slot.location,
            price: slot.price,
            skill: slot.skill,
        }
    }
}

/// Identifies a listing to act upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListingRef {
    Single {
        id: String,
    },
    Derived {
        #[serde(rename = "ruleId")]
        rule_id: String,
        date: NaiveDate,
    },
}

/// How much of a derived listing to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteScope {
    /// Exclude only the listing's date from its rule.
    #[default]
    ThisDate,
    /// Delete the whole rule with every future instance and exclusion.
    AllFuture,
}

/// Sort listings by date, then start time, then end time.
pub fn sort_chronologically(listings: &mut [Listing]) {
    listings.sort_by(|a, b| {
        (a.date, a.start_time, a.end_time).cmp(&(b.date, b.start_time, b.end_time))
    });
}
