//! Error types for slot-engine operations.

use thiserror::Error;

use crate::conflict::Conflict;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Time conflict: {0}")]
    Conflict(Conflict),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A batch create failed after `created` records were already committed.
    #[error("Batch interrupted after {} of its records were created: {source}", .created.len())]
    BatchInterrupted {
        created: Vec<String>,
        #[source]
        source: Box<AvailabilityError>,
    },
}

impl AvailabilityError {
    /// True for errors caused by the caller's input rather than by the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidTime(_) | Self::Validation(_))
    }

    /// Wrap any store-side failure as a transport error.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Transport(err.into())
    }
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;
