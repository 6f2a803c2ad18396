//! Groups entry rows into per-lifter observation histories

use std::collections::HashMap;

use crate::date_index::DateIndex;
use crate::error::{Error, Result};
use crate::model::{Age, AgeBounds, AgeObservation, LifterId, NO_MAX_AGE};
use crate::persistence::EntryRow;

/// Every observation of one lifter, sorted by date.
///
/// Observations on the same date keep their input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifterRecord {
    pub lifter_id: LifterId,
    pub observations: Vec<AgeObservation>,
}

impl LifterRecord {
    pub fn new(lifter_id: LifterId, mut observations: Vec<AgeObservation>) -> Self {
        // Stable: ties stay in row order
        observations.sort_by_key(|obs| obs.date);
        Self {
            lifter_id,
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// True when at least one observation carries an age value
    pub fn has_ages(&self) -> bool {
        self.observations.iter().any(|obs| !obs.age.is_none())
    }
}

/// Observations grouped by lifter, with event dates attached.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    lifters: HashMap<LifterId, LifterRecord>,
}

impl ObservationStore {
    /// Parse and group the entry table.
    ///
    /// Fails on the first entry whose event has no date, whose Age cell
    /// cannot be parsed, or whose bounds exceed the sentinel.
    pub fn build(entries: &[EntryRow], dates: &DateIndex) -> Result<Self> {
        let mut grouped: HashMap<LifterId, Vec<AgeObservation>> = HashMap::new();

        for (row, entry) in entries.iter().enumerate() {
            let date = dates.get(entry.event_id).ok_or(Error::MissingDateReference {
                row,
                event_id: entry.event_id,
            })?;
            let age = Age::parse(&entry.age).ok_or_else(|| Error::InvalidAge {
                row,
                value: entry.age.clone(),
            })?;
            if entry.min_age > NO_MAX_AGE || entry.max_age > NO_MAX_AGE {
                return Err(Error::InvalidBounds {
                    row,
                    min_age: entry.min_age,
                    max_age: entry.max_age,
                });
            }

            grouped.entry(entry.lifter_id).or_default().push(AgeObservation {
                row,
                event_id: entry.event_id,
                date,
                age,
                bounds: AgeBounds::from_sentinels(entry.min_age, entry.max_age),
            });
        }

        let lifters = grouped
            .into_iter()
            .map(|(id, observations)| (id, LifterRecord::new(id, observations)))
            .collect();

        Ok(Self { lifters })
    }

    pub fn get(&self, lifter_id: LifterId) -> Option<&LifterRecord> {
        self.lifters.get(&lifter_id)
    }

    pub fn len(&self) -> usize {
        self.lifters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifters.is_empty()
    }

    /// Consume the store, yielding records ordered by lifter id.
    pub fn into_records(self) -> Vec<LifterRecord> {
        let mut records: Vec<LifterRecord> = self.lifters.into_values().collect();
        records.sort_by_key(|record| record.lifter_id);
        records
    }
}
