//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object or an empty environment
//! yields a working configuration.
//!
//! ## Environment variables
//!
//! - `SLOTS_CONFLICT_SCOPE`: `any` or `same-skill` (default `any`)
//! - `SLOTS_CHECK_SINGLES_AGAINST_RULES`: boolean (default `false`)
//! - `SLOTS_BATCH_FAILURE`: `keep` or `rollback` (default `keep`)
//! - `SLOTS_VALIDATE_EXCLUSIONS`: boolean (default `false`)
//! - `SLOTS_DEFAULT_RULE_MONTHS`: positive integer (default `3`)

use serde::{Deserialize, Serialize};

use crate::conflict::{ConflictPolicy, ConflictScope};
use crate::error::{AvailabilityError, Result};

/// What to do with already-created rules when a batch create fails midway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchFailurePolicy {
    /// Leave them in place and report their ids.
    #[default]
    #[serde(alias = "keep")]
    KeepCreated,
    /// Delete them again before reporting the failure.
    #[serde(alias = "rollback")]
    RollBack,
}

impl std::str::FromStr for BatchFailurePolicy {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-created" => Ok(BatchFailurePolicy::KeepCreated),
            "rollback" | "roll-back" => Ok(BatchFailurePolicy::RollBack),
            other => Err(AvailabilityError::Config(format!(
                "unknown batch failure policy '{}' (expected keep or rollback)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub conflict_scope: ConflictScope,
    pub check_singles_against_rules: bool,
    pub batch_failure: BatchFailurePolicy,
    /// Reject exclusions on dates their rule never produces.
    pub validate_exclusions: bool,
    /// Length of a recurring availability created "from today", in months.
    pub default_rule_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_scope: ConflictScope::default(),
            check_singles_against_rules: false,
            batch_failure: BatchFailurePolicy::default(),
            validate_exclusions: false,
            default_rule_months: 3,
        }
    }
}

impl EngineConfig {
    /// Load from `SLOTS_*` environment variables, defaulting unset ones.
    ///
    /// # Errors
    /// Returns `AvailabilityError::Config` if a variable is set to an
    /// unparseable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, tests, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("SLOTS_CONFLICT_SCOPE") {
            config.conflict_scope = raw
                .parse::<ConflictScope>()
                .map_err(|e| AvailabilityError::Config(format!("SLOTS_CONFLICT_SCOPE: {}", e)))?;
        }
        if let Some(raw) = lookup("SLOTS_CHECK_SINGLES_AGAINST_RULES") {
            config.check_singles_against_rules = parse_flag("SLOTS_CHECK_SINGLES_AGAINST_RULES", &raw)?;
        }
        if let Some(raw) = lookup("SLOTS_BATCH_FAILURE") {
            config.batch_failure = raw.parse::<BatchFailurePolicy>()?;
        }
        if let Some(raw) = lookup("SLOTS_VALIDATE_EXCLUSIONS") {
            config.validate_exclusions = parse_flag("SLOTS_VALIDATE_EXCLUSIONS", &raw)?;
        }
        if let Some(raw) = lookup("SLOTS_DEFAULT_RULE_MONTHS") {
            config.default_rule_months = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|months| *months > 0)
                .ok_or_else(|| {
                    AvailabilityError::Config(format!(
                        "SLOTS_DEFAULT_RULE_MONTHS must be a positive integer, got '{}'",
                        raw
                    ))
                })?;
        }

        Ok(config)
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AvailabilityError::Config(e.to_string()))
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy {
            scope: self.conflict_scope,
            check_singles_against_rules: self.check_singles_against_rules,
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AvailabilityError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}
