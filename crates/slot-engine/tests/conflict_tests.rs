//! Tests for conflict detection between new and existing listings.

use chrono::{NaiveDate, Weekday};
use slot_engine::conflict::{ensure_no_conflict, find_batch_conflict, ConflictingEntry};
use slot_engine::model::{NewRecurrenceRule, NewSlot};
use slot_engine::{
    find_conflicts, AvailabilityError, Candidate, ConflictPolicy, ConflictScope, ExclusionIndex,
    RecurrenceRule, Skill, Slot, TimeWindow,
};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
}

fn single(id: &str, teacher: &str, day: &str, start: &str, end: &str, skill: Skill) -> Slot {
    Slot {
        id: id.to_string(),
        teacher_id: teacher.to_string(),
        date: date(day),
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        location: "Vail".to_string(),
        price: 60.0,
        skill,
    }
}

fn weekly(id: &str, day: Weekday, start: &str, end: &str, skill: Skill) -> RecurrenceRule {
    RecurrenceRule {
        id: id.to_string(),
        teacher_id: "t1".to_string(),
        day_of_week: day,
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        start_date: date("2024-01-01"),
        end_date: date("2024-03-31"),
        location: "Vail".to_string(),
        price: 60.0,
        skill,
    }
}

fn single_candidate(day: &str, start: &str, end: &str, skill: Skill) -> Candidate {
    Candidate::Single {
        teacher_id: "t1".to_string(),
        date: date(day),
        window: window(start, end),
        skill,
    }
}

fn recurring_candidate(day: Weekday, start: &str, end: &str, skill: Skill) -> Candidate {
    Candidate::Recurring {
        teacher_id: "t1".to_string(),
        day_of_week: day,
        window: window(start, end),
        skill,
        start_date: date("2024-01-01"),
        end_date: date("2024-02-29"),
    }
}

fn any() -> ConflictPolicy {
    ConflictPolicy::default()
}

// ---------------------------------------------------------------------------
// Single candidate
// ---------------------------------------------------------------------------

#[test]
fn same_day_overlap_with_single_reports_existing_window() {
    let singles = vec![single("s1", "t1", "2024-02-01", "09:00", "11:00", Skill::Skiing)];
    let candidate = single_candidate("2024-02-01", "10:00", "12:00", Skill::Skiing);

    let conflicts = find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), any());

    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.start_time.to_string(), "09:00");
    assert_eq!(conflict.end_time.to_string(), "11:00");
    assert_eq!(conflict.overlap_minutes, 60);
    assert_eq!(
        conflict.existing,
        ConflictingEntry::Single {
            id: "s1".to_string(),
            date: date("2024-02-01")
        }
    );
    assert_eq!(
        conflict.to_string(),
        "overlaps the existing skiing listing 9:00 AM - 11:00 AM on 2024-02-01"
    );
}

#[test]
fn touching_windows_do_not_conflict() {
    let singles = vec![single("s1", "t1", "2024-02-01", "09:00", "10:00", Skill::Skiing)];
    let candidate = single_candidate("2024-02-01", "10:00", "11:00", Skill::Skiing);
    assert!(find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), any()).is_empty());
}

#[test]
fn other_dates_and_other_teachers_are_ignored() {
    let singles = vec![
        single("s1", "t1", "2024-02-02", "09:00", "11:00", Skill::Skiing),
        single("s2", "t2", "2024-02-01", "09:00", "11:00", Skill::Skiing),
    ];
    let candidate = single_candidate("2024-02-01", "09:00", "11:00", Skill::Skiing);
    assert!(find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), any()).is_empty());
}

#[test]
fn single_conflicts_with_rule_on_matching_weekday() {
    // 2024-02-01 is a Thursday.
    let rules = vec![weekly("r1", Weekday::Thu, "08:00", "09:30", Skill::Skiing)];
    let candidate = single_candidate("2024-02-01", "09:00", "10:00", Skill::Skiing);

    let conflicts = find_conflicts(&candidate, &[], &rules, &ExclusionIndex::new(), any());
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].existing,
        ConflictingEntry::Recurring {
            rule_id: "r1".to_string(),
            day_of_week: Weekday::Thu
        }
    );
    assert_eq!(conflicts[0].overlap_minutes, 30);
}

#[test]
fn single_outside_rule_range_or_on_excluded_date_is_free() {
    let rules = vec![weekly("r1", Weekday::Thu, "09:00", "11:00", Skill::Skiing)];

    let after_range = single_candidate("2024-04-04", "09:00", "11:00", Skill::Skiing);
    assert!(find_conflicts(&after_range, &[], &rules, &ExclusionIndex::new(), any()).is_empty());

    let mut exclusions = ExclusionIndex::new();
    exclusions.insert("r1", date("2024-02-01"));
    let excluded_day = single_candidate("2024-02-01", "09:00", "11:00", Skill::Skiing);
    assert!(find_conflicts(&excluded_day, &[], &rules, &exclusions, any()).is_empty());
}

#[test]
fn results_list_singles_before_rules() {
    let singles = vec![single("s1", "t1", "2024-02-01", "09:00", "10:00", Skill::Skiing)];
    let rules = vec![weekly("r1", Weekday::Thu, "09:30", "11:00", Skill::Skiing)];
    let candidate = single_candidate("2024-02-01", "09:00", "12:00", Skill::Skiing);

    let conflicts = find_conflicts(&candidate, &singles, &rules, &ExclusionIndex::new(), any());
    assert_eq!(conflicts.len(), 2);
    assert!(matches!(conflicts[0].existing, ConflictingEntry::Single { .. }));
    assert!(matches!(conflicts[1].existing, ConflictingEntry::Recurring { .. }));
}

// ---------------------------------------------------------------------------
// Skill scope
// ---------------------------------------------------------------------------

#[test]
fn different_skills_do_not_conflict_in_same_skill_scope() {
    let singles = vec![single("s1", "t1", "2024-02-01", "09:00", "11:00", Skill::Snowboarding)];
    let candidate = single_candidate("2024-02-01", "09:00", "11:00", Skill::Skiing);

    let same_skill = ConflictPolicy::with_scope(ConflictScope::SameSkill);
    assert!(find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), same_skill).is_empty());

    assert_eq!(
        find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), any()).len(),
        1
    );
}

#[test]
fn same_skill_scope_still_catches_same_sport() {
    let rules = vec![weekly("r1", Weekday::Sat, "09:00", "11:00", Skill::Snowboarding)];
    let candidate = recurring_candidate(Weekday::Sat, "10:00", "12:00", Skill::Snowboarding);
    let same_skill = ConflictPolicy::with_scope(ConflictScope::SameSkill);
    assert_eq!(
        find_conflicts(&candidate, &[], &rules, &ExclusionIndex::new(), same_skill).len(),
        1
    );
}

// ---------------------------------------------------------------------------
// Recurring candidate
// ---------------------------------------------------------------------------

#[test]
fn recurring_conflicts_with_rule_on_same_weekday() {
    let rules = vec![
        weekly("mon", Weekday::Mon, "09:00", "11:00", Skill::Skiing),
        weekly("tue", Weekday::Tue, "09:00", "11:00", Skill::Skiing),
    ];
    let candidate = recurring_candidate(Weekday::Mon, "10:30", "12:00", Skill::Skiing);

    let conflicts = find_conflicts(&candidate, &[], &rules, &ExclusionIndex::new(), any());
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].to_string(),
        "overlaps the existing skiing availability 9:00 AM - 11:00 AM every Monday"
    );
}

#[test]
fn recurring_ignores_singles_unless_asked() {
    // 2024-01-08 is a Monday inside the candidate's range.
    let singles = vec![single("s1", "t1", "2024-01-08", "09:00", "11:00", Skill::Skiing)];
    let candidate = recurring_candidate(Weekday::Mon, "09:00", "11:00", Skill::Skiing);

    assert!(find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), any()).is_empty());

    let strict = ConflictPolicy {
        check_singles_against_rules: true,
        ..ConflictPolicy::default()
    };
    assert_eq!(
        find_conflicts(&candidate, &singles, &[], &ExclusionIndex::new(), strict).len(),
        1
    );

    let outside = vec![single("s2", "t1", "2024-06-03", "09:00", "11:00", Skill::Skiing)];
    assert!(find_conflicts(&candidate, &outside, &[], &ExclusionIndex::new(), strict).is_empty());
}

// ---------------------------------------------------------------------------
// Error form and candidates built from drafts
// ---------------------------------------------------------------------------

#[test]
fn ensure_no_conflict_returns_first_as_error() {
    let singles = vec![
        single("first", "t1", "2024-02-01", "09:00", "10:00", Skill::Skiing),
        single("second", "t1", "2024-02-01", "10:00", "11:00", Skill::Skiing),
    ];
    let candidate = single_candidate("2024-02-01", "09:30", "10:30", Skill::Skiing);

    let err = ensure_no_conflict(&candidate, &singles, &[], &ExclusionIndex::new(), any()).unwrap_err();
    match err {
        AvailabilityError::Conflict(conflict) => assert_eq!(
            conflict.existing,
            ConflictingEntry::Single {
                id: "first".to_string(),
                date: date("2024-02-01")
            }
        ),
        other => panic!("expected a conflict, got {other}"),
    }
}

#[test]
fn candidates_from_drafts() {
    let slot = NewSlot {
        teacher_id: "t1".to_string(),
        date: date("2024-02-01"),
        start_time: "09:00".parse().unwrap(),
        end_time: "10:00".parse().unwrap(),
        location: "Vail".to_string(),
        price: 50.0,
        skill: Skill::Skiing,
    };
    assert_eq!(
        Candidate::from(&slot),
        single_candidate("2024-02-01", "09:00", "10:00", Skill::Skiing)
    );
}

fn draft(day: Weekday, start: &str, end: &str, skill: Skill) -> NewRecurrenceRule {
    NewRecurrenceRule {
        teacher_id: "t1".to_string(),
        day_of_week: day,
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        start_date: date("2024-01-01"),
        end_date: date("2024-03-31"),
        location: "Vail".to_string(),
        price: 60.0,
        skill,
    }
}

#[test]
fn batch_entries_are_checked_against_each_other() {
    let drafts = vec![
        draft(Weekday::Mon, "09:00", "11:00", Skill::Skiing),
        draft(Weekday::Tue, "09:00", "11:00", Skill::Skiing),
        draft(Weekday::Mon, "10:00", "12:00", Skill::Skiing),
    ];
    let (index, conflict) = find_batch_conflict(&drafts, any()).expect("entries 1 and 3 overlap");
    assert_eq!(index, 2);
    assert_eq!(
        conflict.existing,
        ConflictingEntry::Draft {
            index: 0,
            day_of_week: Weekday::Mon
        }
    );
    assert_eq!(
        conflict.to_string(),
        "overlaps availability #1 (skiing 9:00 AM - 11:00 AM on Monday)"
    );
}

#[test]
fn batch_with_different_sports_passes_in_same_skill_scope() {
    let drafts = vec![
        draft(Weekday::Mon, "09:00", "11:00", Skill::Skiing),
        draft(Weekday::Mon, "09:00", "11:00", Skill::Snowboarding),
    ];
    assert!(find_batch_conflict(&drafts, ConflictPolicy::with_scope(ConflictScope::SameSkill)).is_none());
    assert!(find_batch_conflict(&drafts, any()).is_some());
}
