//! WASM bindings for slot-engine.
//!
//! Exposes rule expansion, conflict detection, filtering and time display to
//! JavaScript via `wasm-bindgen`. Records cross the boundary as JSON strings in
//! the same camelCase shape the engine serializes (`teacherId`, `dayOfWeek`
//! with Sunday = 0, dates as `YYYY-MM-DD`, times as `HH:MM`).
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/slot-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slot_engine::model::sort_chronologically;
use slot_engine::{
    Candidate, ConflictPolicy, Exclusion, ExclusionIndex, FilterCriteria, Listing,
    NewRecurrenceRule, NewSlot, RecurrenceRule, Slot,
};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A proposed listing: a single-date draft or a weekly rule draft.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateInput {
    Rule(NewRecurrenceRule),
    Single(NewSlot),
}

fn parse_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn parse_exclusions(json: Option<&str>) -> Result<ExclusionIndex, String> {
    match json {
        Some(json) => {
            let exclusions: Vec<Exclusion> = parse_json("exclusions", json)?;
            Ok(exclusions.into_iter().collect())
        }
        None => Ok(ExclusionIndex::new()),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn to_js(err: String) -> JsValue {
    JsValue::from_str(&err)
}

// ---------------------------------------------------------------------------
// Implementations (plain Rust so they can be tested off-wasm)
// ---------------------------------------------------------------------------

fn expand_rules_impl(rules_json: &str, exclusions_json: Option<&str>, today: &str) -> Result<String, String> {
    let rules: Vec<RecurrenceRule> = parse_json("rules", rules_json)?;
    let exclusions = parse_exclusions(exclusions_json)?;
    let today: NaiveDate = today
        .parse()
        .map_err(|e| format!("Invalid date '{}': {}", today, e))?;

    let mut listings = slot_engine::expand_all(&rules, &exclusions, today);
    sort_chronologically(&mut listings);
    to_json(&listings)
}

fn filter_listings_impl(listings_json: &str, criteria_json: &str) -> Result<String, String> {
    let listings: Vec<Listing> = parse_json("listings", listings_json)?;
    let criteria: FilterCriteria = parse_json("criteria", criteria_json)?;
    to_json(&slot_engine::filter_listings(&listings, &criteria))
}

fn find_conflicts_impl(
    candidate_json: &str,
    singles_json: &str,
    rules_json: &str,
    exclusions_json: Option<&str>,
    policy_json: Option<&str>,
) -> Result<String, String> {
    let candidate = match parse_json::<CandidateInput>("candidate", candidate_json)? {
        CandidateInput::Rule(rule) => {
            rule.validate().map_err(|e| e.to_string())?;
            Candidate::from(&rule)
        }
        CandidateInput::Single(slot) => {
            slot.validate().map_err(|e| e.to_string())?;
            Candidate::from(&slot)
        }
    };
    let singles: Vec<Slot> = parse_json("singles", singles_json)?;
    let rules: Vec<RecurrenceRule> = parse_json("rules", rules_json)?;
    let exclusions = parse_exclusions(exclusions_json)?;
    let policy: ConflictPolicy = match policy_json {
        Some(json) => parse_json("policy", json)?,
        None => ConflictPolicy::default(),
    };

    let conflicts = slot_engine::find_conflicts(&candidate, &singles, &rules, &exclusions, policy);
    to_json(&conflicts)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand recurrence rules into dated listings from `today` on.
///
/// `rules_json` is a JSON array of rules, `exclusions_json` an optional JSON array
/// of `{recurrenceRuleId, date}`. Returns a JSON array of listings sorted by date
/// and start time; derived ones carry `origin: {kind: "recurring", ruleId}`.
#[wasm_bindgen(js_name = "expandRules")]
pub fn expand_rules(rules_json: &str, exclusions_json: Option<String>, today: &str) -> Result<String, JsValue> {
    expand_rules_impl(rules_json, exclusions_json.as_deref(), today).map_err(to_js)
}

/// Apply learner filter criteria (`{dateRange, skill, minPrice, maxPrice,
/// timeRange}`, all optional) to a JSON array of listings.
#[wasm_bindgen(js_name = "filterListings")]
pub fn filter_listings(listings_json: &str, criteria_json: &str) -> Result<String, JsValue> {
    filter_listings_impl(listings_json, criteria_json).map_err(to_js)
}

/// List every existing listing or rule a proposed listing overlaps.
///
/// The candidate is a new single listing (with `date`) or a new rule (with
/// `dayOfWeek`, `startDate`, `endDate`). `policy_json` may set `scope`
/// (`"any-overlap"` or `"same-skill"`) and `checkSinglesAgainstRules`. An empty
/// array means the candidate can be saved.
#[wasm_bindgen(js_name = "findConflicts")]
pub fn find_conflicts(
    candidate_json: &str,
    singles_json: &str,
    rules_json: &str,
    exclusions_json: Option<String>,
    policy_json: Option<String>,
) -> Result<String, JsValue> {
    find_conflicts_impl(
        candidate_json,
        singles_json,
        rules_json,
        exclusions_json.as_deref(),
        policy_json.as_deref(),
    )
    .map_err(to_js)
}

/// `"14:30"` → `"2:30 PM"`.
#[wasm_bindgen(js_name = "formatTime")]
pub fn format_time(time: &str) -> Result<String, JsValue> {
    slot_engine::parse_time(time)
        .map(slot_engine::format_display)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// `"2:30 PM"` → `"14:30"`.
#[wasm_bindgen(js_name = "to24Hour")]
pub fn to_24_hour(display: &str) -> Result<String, JsValue> {
    slot_engine::to_24_hour(display)
        .map(|time| time.to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// The half-hour picker values as a JSON array of display strings.
#[wasm_bindgen(js_name = "timeOptions")]
pub fn time_options() -> String {
    serde_json::Value::from(slot_engine::time::time_options()).to_string()
}

/// `"2024-01-01"` → `"Monday, January 1, 2024"`, or `"Mon, Jan 1"` when `short`.
#[wasm_bindgen(js_name = "formatDate")]
pub fn format_date(date: &str, short: bool) -> Result<String, JsValue> {
    let date: NaiveDate = date
        .parse()
        .map_err(|e| JsValue::from_str(&format!("Invalid date '{}': {}", date, e)))?;
    Ok(if short {
        slot_engine::calendar::format_short_date(date)
    } else {
        slot_engine::calendar::format_long_date(date)
    })
}
