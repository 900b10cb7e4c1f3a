//! Learner-side filtering of a listing collection.
//!
//! Every criterion is optional; the ones present are combined with AND. The
//! output keeps the input order, so applying the same criteria twice changes
//! nothing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Listing, Skill};
use crate::time::TimeOfDay;

/// Filter criteria for browsing listings.
///
/// # Examples
///
/// ```
/// use slot_engine::{FilterCriteria, Skill};
///
/// let criteria = FilterCriteria::new()
///     .skill(Skill::Skiing)
///     .price_between(Some(40.0), Some(90.0));
/// assert!(!criteria.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Inclusive `[from, to]` on the listing date.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub skill: Option<Skill>,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
    /// The listing must start no earlier than the first time and end no later
    /// than the second.
    pub time_range: Option<(TimeOfDay, TimeOfDay)>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dates(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some((from, to));
        self
    }

    pub fn skill(mut self, skill: Skill) -> Self {
        self.skill = Some(skill);
        self
    }

    pub fn price_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn times(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.time_range = Some((start, end));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some((from, to)) = self.date_range {
            if listing.date < from || listing.date > to {
                return false;
            }
        }
        if let Some(skill) = self.skill {
            if listing.skill != skill {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        if let Some((start, end)) = self.time_range {
            if listing.start_time < start || listing.end_time > end {
                return false;
            }
        }
        true
    }
}

/// Keep the listings matching `criteria`, in input order.
pub fn filter_listings(listings: &[Listing], criteria: &FilterCriteria) -> Vec<Listing> {
    listings
        .iter()
        .filter(|listing| criteria.matches(listing))
        .cloned()
        .collect()
}
