//! In-process [`AvailabilityRepository`] backed by vectors behind an async lock.
//!
//! Used by tests, the demo tooling and anything that does not need a real
//! document store. It enforces the same record-level rules a store would
//! (unknown ids are `NotFound`, exclusions are unique per rule and date) but
//! does not re-check time conflicts on insert.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AvailabilityError, Result};
use crate::model::{Exclusion, NewRecurrenceRule, NewSlot, RecurrenceRule, Slot};
use crate::repository::AvailabilityRepository;

#[derive(Debug, Default)]
struct State {
    singles: Vec<Slot>,
    rules: Vec<RecurrenceRule>,
    exclusions: BTreeSet<Exclusion>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, keeping their ids.
    pub fn with_records(
        singles: Vec<Slot>,
        rules: Vec<RecurrenceRule>,
        exclusions: impl IntoIterator<Item = Exclusion>,
    ) -> Self {
        Self {
            state: RwLock::new(State {
                singles,
                rules,
                exclusions: exclusions.into_iter().collect(),
            }),
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl AvailabilityRepository for InMemoryRepository {
    async fn list_single_listings(&self, teacher_id: Option<String>) -> Result<Vec<Slot>> {
        let state = self.state.read().await;
        let mut singles: Vec<Slot> = state
            .singles
            .iter()
            .filter(|slot| teacher_id.as_ref().is_none_or(|t| &slot.teacher_id == t))
            .cloned()
            .collect();
        singles.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(singles)
    }

    async fn create_single_listing(&self, slot: NewSlot) -> Result<String> {
        let id = new_id();
        tracing::debug!(id = %id, teacher_id = %slot.teacher_id, "storing single listing");
        self.state.write().await.singles.push(slot.into_slot(id.clone()));
        Ok(id)
    }

    async fn delete_single_listing(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let position = state
            .singles
            .iter()
            .position(|slot| slot.id == id)
            .ok_or_else(|| AvailabilityError::NotFound(format!("single listing {}", id)))?;
        state.singles.remove(position);
        tracing::debug!(id = %id, "deleted single listing");
        Ok(())
    }

    async fn list_recurrence_rules(&self, teacher_id: Option<String>) -> Result<Vec<RecurrenceRule>> {
        let state = self.state.read().await;
        Ok(state
            .rules
            .iter()
            .filter(|rule| teacher_id.as_ref().is_none_or(|t| &rule.teacher_id == t))
            .cloned()
            .collect())
    }

    async fn get_recurrence_rule(&self, id: &str) -> Result<Option<RecurrenceRule>> {
        let state = self.state.read().await;
        Ok(state.rules.iter().find(|rule| rule.id == id).cloned())
    }

    async fn create_recurrence_rule(&self, rule: NewRecurrenceRule) -> Result<String> {
        let id = new_id();
        tracing::debug!(id = %id, teacher_id = %rule.teacher_id, "storing recurrence rule");
        self.state.write().await.rules.push(rule.into_rule(id.clone()));
        Ok(id)
    }

    async fn delete_recurrence_rule(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let position = state
            .rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or_else(|| AvailabilityError::NotFound(format!("recurrence rule {}", id)))?;
        state.rules.remove(position);
        state.exclusions.retain(|exclusion| exclusion.rule_id != id);
        tracing::debug!(id = %id, "deleted recurrence rule and its exclusions");
        Ok(())
    }

    async fn list_exclusions(&self, rule_id: &str) -> Result<Vec<NaiveDate>> {
        let state = self.state.read().await;
        Ok(state
            .exclusions
            .iter()
            .filter(|exclusion| exclusion.rule_id == rule_id)
            .map(|exclusion| exclusion.date)
            .collect())
    }

    async fn list_all_exclusions_for_teacher(&self, teacher_id: &str) -> Result<Vec<Exclusion>> {
        let state = self.state.read().await;
        let rule_ids: BTreeSet<&str> = state
            .rules
            .iter()
            .filter(|rule| rule.teacher_id == teacher_id)
            .map(|rule| rule.id.as_str())
            .collect();
        Ok(state
            .exclusions
            .iter()
            .filter(|exclusion| rule_ids.contains(exclusion.rule_id.as_str()))
            .cloned()
            .collect())
    }

    async fn add_exclusion(&self, rule_id: &str, date: NaiveDate) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.rules.iter().any(|rule| rule.id == rule_id) {
            return Err(AvailabilityError::NotFound(format!("recurrence rule {}", rule_id)));
        }
        state.exclusions.insert(Exclusion {
            rule_id: rule_id.to_string(),
            date,
        });
        Ok(())
    }

    async fn remove_exclusion(&self, rule_id: &str, date: NaiveDate) -> Result<()> {
        let mut state = self.state.write().await;
        let removed = state.exclusions.remove(&Exclusion {
            rule_id: rule_id.to_string(),
            date,
        });
        if !removed {
            return Err(AvailabilityError::NotFound(format!(
                "exclusion of {} on rule {}",
                date, rule_id
            )));
        }
        Ok(())
    }
}
