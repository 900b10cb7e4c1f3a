//! Calendar helpers for the teacher's availability view: per-day markers,
//! the listings of a single day, and date labels.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{sort_chronologically, Exclusion, Listing};

/// What a calendar day carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayMark {
    pub listings: usize,
    /// Dates removed from a recurring availability on this day.
    pub exclusions: usize,
}

/// Count listings and exclusions per date. Dates with neither are absent.
pub fn mark_calendar(listings: &[Listing], exclusions: &[Exclusion]) -> BTreeMap<NaiveDate, DayMark> {
    let mut marks: BTreeMap<NaiveDate, DayMark> = BTreeMap::new();
    for listing in listings {
        marks.entry(listing.date).or_default().listings += 1;
    }
    for exclusion in exclusions {
        marks.entry(exclusion.date).or_default().exclusions += 1;
    }
    marks
}

/// Everything scheduled on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    /// Sorted by start time.
    pub listings: Vec<Listing>,
    /// Exclusions taken on this date; each can be restored.
    pub exclusions: Vec<Exclusion>,
}

impl DayView {
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty() && self.exclusions.is_empty()
    }
}

pub fn day_view(listings: &[Listing], exclusions: &[Exclusion], date: NaiveDate) -> DayView {
    let mut day_listings: Vec<Listing> = listings
        .iter()
        .filter(|listing| listing.date == date)
        .cloned()
        .collect();
    sort_chronologically(&mut day_listings);

    DayView {
        date,
        listings: day_listings,
        exclusions: exclusions
            .iter()
            .filter(|exclusion| exclusion.date == date)
            .cloned()
            .collect(),
    }
}

/// `Monday, January 1, 2024`
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// `Mon, Jan 1`
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListingOrigin, Skill};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn listing(id: &str, day: &str, start: &str, end: &str) -> Listing {
        Listing {
            origin: ListingOrigin::Single { id: id.to_string() },
            teacher_id: "t1".to_string(),
            date: date(day),
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            location: "Vail".to_string(),
            price: 60.0,
            skill: Skill::Skiing,
        }
    }

    #[test]
    fn marks_count_listings_and_exclusions() {
        let listings = vec![
            listing("a", "2024-01-08", "09:00", "10:00"),
            listing("b", "2024-01-08", "13:00", "14:00"),
            listing("c", "2024-01-09", "09:00", "10:00"),
        ];
        let exclusions = vec![Exclusion {
            rule_id: "r1".to_string(),
            date: date("2024-01-15"),
        }];

        let marks = mark_calendar(&listings, &exclusions);
        assert_eq!(marks.len(), 3);
        assert_eq!(marks[&date("2024-01-08")].listings, 2);
        assert_eq!(marks[&date("2024-01-15")], DayMark { listings: 0, exclusions: 1 });
    }

    #[test]
    fn day_view_sorts_by_start() {
        let listings = vec![
            listing("late", "2024-01-08", "13:00", "14:00"),
            listing("other-day", "2024-01-09", "08:00", "09:00"),
            listing("early", "2024-01-08", "09:00", "10:00"),
        ];
        let view = day_view(&listings, &[], date("2024-01-08"));
        let ids: Vec<String> = view.listings.iter().map(Listing::display_id).collect();
        assert_eq!(ids, ["early", "late"]);
        assert!(!view.is_empty());
        assert!(day_view(&listings, &[], date("2024-01-10")).is_empty());
    }

    #[test]
    fn date_labels() {
        assert_eq!(format_long_date(date("2024-01-01")), "Monday, January 1, 2024");
        assert_eq!(format_short_date(date("2024-02-09")), "Fri, Feb 9");
    }
}
