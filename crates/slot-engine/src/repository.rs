//! The storage seam consumed by [`crate::service::AvailabilityService`].
//!
//! Implementations map their own failures onto `AvailabilityError::Transport`
//! (store unreachable) and `AvailabilityError::NotFound` (record already gone).
//! Retrying, if any, is the implementation's business.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{Exclusion, NewRecurrenceRule, NewSlot, RecurrenceRule, Slot};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Single listings of one teacher, or of every teacher when `None`.
    async fn list_single_listings(&self, teacher_id: Option<String>) -> Result<Vec<Slot>>;

    /// Store a listing and return its new id.
    async fn create_single_listing(&self, slot: NewSlot) -> Result<String>;

    async fn delete_single_listing(&self, id: &str) -> Result<()>;

    /// Recurrence rules of one teacher, or of every teacher when `None`.
    async fn list_recurrence_rules(&self, teacher_id: Option<String>) -> Result<Vec<RecurrenceRule>>;

    async fn get_recurrence_rule(&self, id: &str) -> Result<Option<RecurrenceRule>>;

    /// Store a rule and return its new id.
    async fn create_recurrence_rule(&self, rule: NewRecurrenceRule) -> Result<String>;

    /// Delete a rule together with its exclusions.
    async fn delete_recurrence_rule(&self, id: &str) -> Result<()>;

    async fn list_exclusions(&self, rule_id: &str) -> Result<Vec<NaiveDate>>;

    async fn list_all_exclusions_for_teacher(&self, teacher_id: &str) -> Result<Vec<Exclusion>>;

    /// Adding an exclusion that already exists is a no-op.
    async fn add_exclusion(&self, rule_id: &str, date: NaiveDate) -> Result<()>;

    async fn remove_exclusion(&self, rule_id: &str, date: NaiveDate) -> Result<()>;
}
