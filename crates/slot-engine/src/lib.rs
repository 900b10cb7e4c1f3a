//! # slot-engine
//!
//! Availability core for a lesson marketplace where instructors publish
//! time-bounded availability and learners browse it.
//!
//! Teachers publish single listings (one date, one window) and weekly recurrence
//! rules (a weekday and a window between two dates, minus excluded dates). The
//! engine expands rules into dated listings, rejects new listings that overlap a
//! teacher's existing ones, and filters the combined set for learners.
//!
//! All dates and times are wall-clock values in one implicit timezone. "Today" is
//! always passed in, never read from the system clock.
//!
//! ## Modules
//!
//! - [`time`]: `HH:MM` parsing, half-open overlap, 12-hour display
//! - [`model`]: listings, rules, exclusions, drafts, validation
//! - [`expander`]: rule + exclusions + today → lazy dated listings
//! - [`conflict`]: overlap detection against existing commitments
//! - [`filter`]: learner-side criteria (dates, skill, price, time)
//! - [`calendar`]: per-day markers, day view, date labels
//! - [`config`]: engine configuration
//! - [`repository`], [`memory`], [`service`]: storage seam and the async
//!   operations built on it (feature `store`, on by default)
//! - [`error`]: error types

pub mod calendar;
pub mod config;
pub mod conflict;
pub mod error;
pub mod expander;
pub mod filter;
pub mod model;
pub mod time;

#[cfg(feature = "store")]
pub mod memory;
#[cfg(feature = "store")]
pub mod repository;
#[cfg(feature = "store")]
pub mod service;

pub use config::EngineConfig;
pub use conflict::{find_conflicts, Candidate, Conflict, ConflictPolicy, ConflictScope};
pub use error::AvailabilityError;
pub use expander::{expand, expand_all, expand_rule};
pub use filter::{filter_listings, FilterCriteria};
pub use model::{
    Exclusion, ExclusionIndex, Listing, ListingOrigin, ListingRef, NewRecurrenceRule, NewSlot,
    RecurrenceRule, Skill, Slot,
};
pub use time::{format_display, intervals_overlap, parse_time, to_24_hour, TimeOfDay, TimeWindow};

#[cfg(feature = "store")]
pub use memory::InMemoryRepository;
#[cfg(feature = "store")]
pub use repository::AvailabilityRepository;
#[cfg(feature = "store")]
pub use service::AvailabilityService;
