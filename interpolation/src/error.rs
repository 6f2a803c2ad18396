//! Error types for the interpolation pass
//!
//! `Error` is fatal: the pass aborts and produces no output.
//! `Inconsistency` is recoverable: only the affected lifter is skipped.

use thiserror::Error;

use crate::model::{EventId, LifterId};

/// Result type for fallible interpolation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors: broken input tables, persistence or configuration
#[derive(Error, Debug)]
pub enum Error {
    /// An entry references an event that has no date
    #[error("entry row {row} references event {event_id} which has no date")]
    MissingDateReference { row: usize, event_id: EventId },

    /// An event date is not in YYYY-MM-DD form
    #[error("event {event_id} has invalid date {value:?}: {source}")]
    InvalidDate {
        event_id: EventId,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The same event is listed twice with different dates
    #[error("event {0} is listed more than once with different dates")]
    DuplicateEvent(EventId),

    /// An Age cell is neither empty, an integer, nor a half-integer
    #[error("entry row {row} has invalid age {value:?}")]
    InvalidAge { row: usize, value: String },

    /// A MinAge or MaxAge cell above the "no upper bound" sentinel
    #[error("entry row {row} has out-of-range age bounds [{min_age}, {max_age}]")]
    InvalidBounds {
        row: usize,
        min_age: u32,
        max_age: u32,
    },

    /// Dataset schema version this build cannot read
    #[error("unsupported dataset version: {0}")]
    UnsupportedVersion(u8),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a lifter's observations cannot come from a single birthdate.
///
/// Returned by the consistency checks and the interpolator; the pass logs it
/// and leaves the lifter's rows untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    #[error("lifter {lifter}: observation on {date} has inverted or violated bounds")]
    BoundsInverted {
        lifter: LifterId,
        date: chrono::NaiveDate,
    },

    #[error("lifter {lifter}: age on {date} contradicts the age trend ({reason})")]
    AgeTrend {
        lifter: LifterId,
        date: chrono::NaiveDate,
        reason: &'static str,
    },

    #[error("lifter {lifter}: exact ages imply more than one birthday")]
    Birthday { lifter: LifterId },

    #[error("lifter {lifter}: no birthyear satisfies every observation")]
    BirthYear { lifter: LifterId },

    #[error("lifter {lifter}: inferred age for {date} contradicts its recorded bounds")]
    ResolutionConflict {
        lifter: LifterId,
        date: chrono::NaiveDate,
    },
}

impl Inconsistency {
    pub fn lifter(&self) -> LifterId {
        match self {
            Inconsistency::BoundsInverted { lifter, .. }
            | Inconsistency::AgeTrend { lifter, .. }
            | Inconsistency::Birthday { lifter }
            | Inconsistency::BirthYear { lifter }
            | Inconsistency::ResolutionConflict { lifter, .. } => *lifter,
        }
    }
}
