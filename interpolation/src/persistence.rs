//! Persistence module for dataset import/export
//!
//! Serializes the entry and event tables to JSON and restores them. Column
//! names follow the record table (`LifterID`, `Age`, `MinAge`, ...); columns
//! this crate does not know are carried through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::age_class::AgeClass;
use crate::error::{Error, Result};
use crate::model::{EventId, LifterId, NO_MAX_AGE, NO_MIN_AGE};

/// Schema version written by this build
pub const DATASET_VERSION: u8 = 1;

// ============================================================================
// Table Rows
// ============================================================================

/// One row of the event table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    /// `YYYY-MM-DD`
    #[serde(rename = "Date")]
    pub date: String,
}

/// One row of the entry table, before interpolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRow {
    #[serde(rename = "LifterID")]
    pub lifter_id: LifterId,
    /// Empty, `NN` or `NN.5`
    #[serde(rename = "Age", default)]
    pub age: String,
    /// `0` means no lower bound
    #[serde(rename = "MinAge", default = "no_min_age")]
    pub min_age: u32,
    /// `999` means no upper bound
    #[serde(rename = "MaxAge", default = "no_max_age")]
    pub max_age: u32,
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One row of the entry table, after interpolation.
///
/// `MinAge` and `MaxAge` are dropped and `AgeClass` is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "LifterID")]
    pub lifter_id: LifterId,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    #[serde(rename = "AgeClass")]
    pub age_class: AgeClass,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn no_min_age() -> u32 {
    NO_MIN_AGE
}

fn no_max_age() -> u32 {
    NO_MAX_AGE
}

// ============================================================================
// Datasets
// ============================================================================

/// Input tables for one interpolation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub version: u8, // Schema version for forward compatibility
    pub events: Vec<EventRow>,
    pub entries: Vec<EntryRow>,
}

/// Interpolated entry table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputDataset {
    pub version: u8,
    pub entries: Vec<OutputRow>,
}

/// Result of a save operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveStats {
    pub rows: usize,
    pub file_bytes: u64,
}

impl Dataset {
    pub fn new(events: Vec<EventRow>, entries: Vec<EntryRow>) -> Self {
        Self {
            version: DATASET_VERSION,
            events,
            entries,
        }
    }

    /// Parse a dataset from JSON, rejecting unknown schema versions
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Dataset = serde_json::from_str(json)?;
        check_version(data.version)?;
        Ok(data)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<SaveStats> {
        write_json(path.as_ref(), &self.to_json()?, self.entries.len())
    }
}

impl OutputDataset {
    pub fn new(entries: Vec<OutputRow>) -> Self {
        Self {
            version: DATASET_VERSION,
            entries,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: OutputDataset = serde_json::from_str(json)?;
        check_version(data.version)?;
        Ok(data)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<SaveStats> {
        write_json(path.as_ref(), &self.to_json()?, self.entries.len())
    }
}

fn check_version(version: u8) -> Result<()> {
    if version != DATASET_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(())
}

fn write_json(path: &Path, json: &str, rows: usize) -> Result<SaveStats> {
    fs::write(path, json)?;
    Ok(SaveStats {
        rows,
        file_bytes: json.len() as u64,
    })
}
