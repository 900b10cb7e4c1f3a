//! Teacher- and learner-facing availability operations on top of a repository.
//!
//! Every operation validates its input, reads what it needs (fanning out
//! independent reads concurrently), and only then writes. Conflict checks and the
//! following create are separate round-trips: two concurrent creates for the same
//! teacher can both pass the check. Closing that window needs a constraint in the
//! store itself.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calendar::{day_view, mark_calendar, DayMark, DayView};
use crate::config::{BatchFailurePolicy, EngineConfig};
use crate::conflict::{ensure_no_conflict, find_batch_conflict, Candidate};
use crate::error::{AvailabilityError, Result};
use crate::expander::expand;
use crate::filter::FilterCriteria;
use crate::model::{
    sort_chronologically, DeleteScope, Exclusion, ExclusionIndex, Listing, ListingRef,
    NewRecurrenceRule, NewSlot, RecurrenceRule, RecurringBatch, Slot,
};
use crate::repository::AvailabilityRepository;

/// Everything a teacher's availability screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherSchedule {
    pub singles: Vec<Slot>,
    pub rules: Vec<RecurrenceRule>,
    pub exclusions: Vec<Exclusion>,
    /// Singles plus the rules expanded from the requested day, chronological.
    pub listings: Vec<Listing>,
}

impl TeacherSchedule {
    pub fn calendar_marks(&self) -> std::collections::BTreeMap<NaiveDate, DayMark> {
        mark_calendar(&self.listings, &self.exclusions)
    }

    pub fn day(&self, date: NaiveDate) -> DayView {
        day_view(&self.listings, &self.exclusions, date)
    }
}

pub struct AvailabilityService<R> {
    repo: R,
    config: EngineConfig,
}

impl<R: AvailabilityRepository> AvailabilityService<R> {
    pub fn new(repo: R, config: EngineConfig) -> Self {
        Self { repo, config }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, conflict-check and store a single listing.
    ///
    /// # Errors
    /// `Validation`/`InvalidTime` for bad input, `Conflict` with the first
    /// overlapping window, or whatever the repository reports.
    pub async fn create_single_listing(&self, new: NewSlot) -> Result<String> {
        new.validate()?;

        let teacher = Some(new.teacher_id.clone());
        let (singles, rules, exclusions) = tokio::try_join!(
            self.repo.list_single_listings(teacher.clone()),
            self.repo.list_recurrence_rules(teacher),
            self.repo.list_all_exclusions_for_teacher(&new.teacher_id),
        )?;
        let exclusions: ExclusionIndex = exclusions.into_iter().collect();

        let candidate = Candidate::from(&new);
        if let Err(err) = ensure_no_conflict(
            &candidate,
            &singles,
            &rules,
            &exclusions,
            self.config.conflict_policy(),
        ) {
            warn!(teacher_id = %new.teacher_id, date = %new.date, "rejected single listing: {}", err);
            return Err(err);
        }

        let teacher_id = new.teacher_id.clone();
        let id = self.repo.create_single_listing(new).await?;
        info!(teacher_id = %teacher_id, id = %id, "created single listing");
        Ok(id)
    }

    /// Validate, conflict-check and store one recurrence rule.
    ///
    /// # Errors
    /// Same as [`Self::create_single_listing`].
    pub async fn create_recurrence_rule(&self, new: NewRecurrenceRule) -> Result<String> {
        new.validate()?;

        let (singles, rules) = self.existing_for_rules(&new.teacher_id).await?;
        let candidate = Candidate::from(&new);
        if let Err(err) = ensure_no_conflict(
            &candidate,
            &singles,
            &rules,
            &ExclusionIndex::new(),
            self.config.conflict_policy(),
        ) {
            warn!(teacher_id = %new.teacher_id, day = %new.day_of_week, "rejected recurrence rule: {}", err);
            return Err(err);
        }

        let teacher_id = new.teacher_id.clone();
        let id = self.repo.create_recurrence_rule(new).await?;
        info!(teacher_id = %teacher_id, id = %id, "created recurrence rule");
        Ok(id)
    }

    /// Store several weekly availabilities running from `today` for the batch's
    /// number of months (or the configured default).
    ///
    /// All entries are validated and conflict-checked, against each other and
    /// against the teacher's existing rules, before anything is written. Rules are
    /// then created one by one; if a create fails the error is
    /// `BatchInterrupted`, whose `created` lists the ids still stored after the
    /// configured [`BatchFailurePolicy`] ran.
    pub async fn create_recurring_batch(
        &self,
        batch: RecurringBatch,
        today: NaiveDate,
    ) -> Result<Vec<String>> {
        let months = batch.months.unwrap_or(self.config.default_rule_months);
        if months == 0 {
            return Err(AvailabilityError::Validation(
                "duration must be at least one month".to_string(),
            ));
        }

        let teacher_id = batch.teacher_id.clone();
        let drafts = batch.into_rules(today, months)?;
        for draft in &drafts {
            draft.validate()?;
        }

        let policy = self.config.conflict_policy();
        if let Some((index, conflict)) = find_batch_conflict(&drafts, policy) {
            warn!(teacher_id = %teacher_id, entry = index + 1, "rejected batch: {}", conflict);
            return Err(AvailabilityError::Conflict(conflict));
        }

        let (singles, rules) = self.existing_for_rules(&teacher_id).await?;
        let exclusions = ExclusionIndex::new();
        for draft in &drafts {
            if let Err(err) = ensure_no_conflict(&Candidate::from(draft), &singles, &rules, &exclusions, policy) {
                warn!(teacher_id = %teacher_id, day = %draft.day_of_week, "rejected batch: {}", err);
                return Err(err);
            }
        }

        let total = drafts.len();
        let mut created = Vec::with_capacity(total);
        for draft in drafts {
            match self.repo.create_recurrence_rule(draft).await {
                Ok(id) => {
                    debug!(teacher_id = %teacher_id, id = %id, "created {} of {} batch rules", created.len() + 1, total);
                    created.push(id);
                }
                Err(err) => return Err(self.abandon_batch(created, err).await),
            }
        }

        info!(teacher_id = %teacher_id, count = created.len(), "created recurring batch");
        Ok(created)
    }

    async fn abandon_batch(&self, created: Vec<String>, cause: AvailabilityError) -> AvailabilityError {
        warn!(committed = created.len(), "batch create failed: {}", cause);

        let remaining = match self.config.batch_failure {
            BatchFailurePolicy::KeepCreated => created,
            BatchFailurePolicy::RollBack => {
                let mut remaining = Vec::new();
                for id in created {
                    if let Err(err) = self.repo.delete_recurrence_rule(&id).await {
                        warn!(id = %id, "could not roll back batch rule: {}", err);
                        remaining.push(id);
                    }
                }
                remaining
            }
        };

        AvailabilityError::BatchInterrupted {
            created: remaining,
            source: Box::new(cause),
        }
    }

    /// Singles are only fetched when the policy compares them with new rules.
    async fn existing_for_rules(&self, teacher_id: &str) -> Result<(Vec<Slot>, Vec<RecurrenceRule>)> {
        let teacher = Some(teacher_id.to_string());
        let singles = async {
            if self.config.check_singles_against_rules {
                self.repo.list_single_listings(teacher.clone()).await
            } else {
                Ok(Vec::new())
            }
        };
        tokio::try_join!(singles, self.repo.list_recurrence_rules(teacher.clone()))
    }

    /// Load a teacher's records and expand their rules from `today`.
    pub async fn teacher_schedule(&self, teacher_id: &str, today: NaiveDate) -> Result<TeacherSchedule> {
        let teacher = Some(teacher_id.to_string());
        let (singles, rules, exclusions) = tokio::try_join!(
            self.repo.list_single_listings(teacher.clone()),
            self.repo.list_recurrence_rules(teacher),
            self.repo.list_all_exclusions_for_teacher(teacher_id),
        )?;

        let index: ExclusionIndex = exclusions.iter().collect();
        let mut listings: Vec<Listing> = singles.iter().cloned().map(Listing::from).collect();
        listings.extend(expand(&rules, &index, today));
        sort_chronologically(&mut listings);

        debug!(teacher_id = %teacher_id, listings = listings.len(), "loaded teacher schedule");
        Ok(TeacherSchedule {
            singles,
            rules,
            exclusions,
            listings,
        })
    }

    /// Every teacher's upcoming listings matching `criteria`, chronological.
    ///
    /// Single listings dated before `today` are left out, like past rule
    /// instances.
    pub async fn browse(&self, today: NaiveDate, criteria: &FilterCriteria) -> Result<Vec<Listing>> {
        let (singles, rules) = tokio::try_join!(
            self.repo.list_single_listings(None),
            self.repo.list_recurrence_rules(None),
        )?;

        let mut index = ExclusionIndex::new();
        for rule in &rules {
            for date in self.repo.list_exclusions(&rule.id).await? {
                index.insert(rule.id.clone(), date);
            }
        }

        let mut listings: Vec<Listing> = singles
            .into_iter()
            .filter(|slot| slot.date >= today)
            .map(Listing::from)
            .chain(expand(&rules, &index, today))
            .filter(|listing| criteria.matches(listing))
            .collect();
        sort_chronologically(&mut listings);

        debug!(listings = listings.len(), "browse results");
        Ok(listings)
    }

    /// Remove a listing. A single listing is deleted whatever the scope; a
    /// derived one is either excluded for its date or has its rule deleted.
    pub async fn delete_listing(&self, listing: &ListingRef, scope: DeleteScope) -> Result<()> {
        match (listing, scope) {
            (ListingRef::Single { id }, _) => {
                self.repo.delete_single_listing(id).await?;
                info!(id = %id, "deleted single listing");
                Ok(())
            }
            (ListingRef::Derived { rule_id, date }, DeleteScope::ThisDate) => {
                self.exclude_date(rule_id, *date).await
            }
            (ListingRef::Derived { rule_id, .. }, DeleteScope::AllFuture) => {
                self.repo.delete_recurrence_rule(rule_id).await?;
                info!(rule_id = %rule_id, "deleted recurrence rule");
                Ok(())
            }
        }
    }

    /// Stop a rule from producing an instance on `date`.
    ///
    /// # Errors
    /// With `validate_exclusions` enabled: `NotFound` for an unknown rule and
    /// `Validation` when the rule never occurs on `date`.
    pub async fn exclude_date(&self, rule_id: &str, date: NaiveDate) -> Result<()> {
        if self.config.validate_exclusions {
            let rule = self
                .repo
                .get_recurrence_rule(rule_id)
                .await?
                .ok_or_else(|| AvailabilityError::NotFound(format!("recurrence rule {}", rule_id)))?;
            if !rule.occurs_on(date) {
                return Err(AvailabilityError::Validation(format!(
                    "rule {} has no instance on {}",
                    rule_id, date
                )));
            }
        }

        self.repo.add_exclusion(rule_id, date).await?;
        info!(rule_id = %rule_id, date = %date, "excluded date");
        Ok(())
    }

    /// Undo [`Self::exclude_date`].
    pub async fn restore_date(&self, rule_id: &str, date: NaiveDate) -> Result<()> {
        self.repo.remove_exclusion(rule_id, date).await?;
        info!(rule_id = %rule_id, date = %date, "restored date");
        Ok(())
    }
}
