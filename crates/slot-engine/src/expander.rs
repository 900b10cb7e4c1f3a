//! Recurrence expansion -- turns weekly rules into dated listings.
//!
//! Expansion is pure: "today" is an argument, never read from the clock. Past
//! occurrences are never produced, excluded dates are skipped, and the result is
//! a lazy iterator that can be cloned to restart it.

use std::collections::BTreeSet;
use std::iter::FusedIterator;

use chrono::{Datelike, Days, NaiveDate};

use crate::model::{ExclusionIndex, Listing, RecurrenceRule};

/// Lazy sequence of the instances of a single rule.
///
/// Starts at the later of the rule's start date and `today`, stops after the
/// rule's end date (inclusive). Dates in the rule's exclusion set are skipped.
#[derive(Debug, Clone)]
pub struct RuleOccurrences<'a> {
    rule: &'a RecurrenceRule,
    excluded: Option<&'a BTreeSet<NaiveDate>>,
    next: Option<NaiveDate>,
}

impl<'a> RuleOccurrences<'a> {
    pub fn new(rule: &'a RecurrenceRule, exclusions: &'a ExclusionIndex, today: NaiveDate) -> Self {
        let effective_start = rule.start_date.max(today);
        let offset = (7 + rule.day_of_week.num_days_from_sunday()
            - effective_start.weekday().num_days_from_sunday())
            % 7;
        let next = effective_start
            .checked_add_days(Days::new(u64::from(offset)))
            .filter(|first| *first <= rule.end_date);

        Self {
            rule,
            excluded: exclusions.dates_for(&rule.id),
            next,
        }
    }

    fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded.is_some_and(|dates| dates.contains(&date))
    }
}

impl Iterator for RuleOccurrences<'_> {
    type Item = Listing;

    fn next(&mut self) -> Option<Listing> {
        loop {
            let date = self.next?;
            self.next = date
                .checked_add_days(Days::new(7))
                .filter(|following| *following <= self.rule.end_date);

            if !self.is_excluded(date) {
                return Some(Listing::from_rule(self.rule, date));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(date) => {
                let remaining = (self.rule.end_date - date).num_days() / 7 + 1;
                (0, Some(remaining as usize))
            }
            None => (0, Some(0)),
        }
    }
}

impl FusedIterator for RuleOccurrences<'_> {}

/// Expand one rule from `today` onward.
pub fn expand_rule<'a>(
    rule: &'a RecurrenceRule,
    exclusions: &'a ExclusionIndex,
    today: NaiveDate,
) -> RuleOccurrences<'a> {
    RuleOccurrences::new(rule, exclusions, today)
}

/// Expand every rule from `today` onward, rule after rule.
///
/// Instances are grouped by rule in input order; within one rule they are
/// chronological. Callers that need a global order should sort, e.g. with
/// [`crate::model::sort_chronologically`].
///
/// No cap is applied: a multi-year rule yields every matching week.
pub fn expand<'a>(
    rules: &'a [RecurrenceRule],
    exclusions: &'a ExclusionIndex,
    today: NaiveDate,
) -> impl Iterator<Item = Listing> + Clone + 'a {
    rules
        .iter()
        .flat_map(move |rule| RuleOccurrences::new(rule, exclusions, today))
}

/// Eager form of [`expand`].
pub fn expand_all(
    rules: &[RecurrenceRule],
    exclusions: &ExclusionIndex,
    today: NaiveDate,
) -> Vec<Listing> {
    expand(rules, exclusions, today).collect()
}
