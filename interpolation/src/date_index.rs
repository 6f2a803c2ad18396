//! Event -> date lookup, built once per pass

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::EventId;
use crate::persistence::EventRow;

/// Immutable map from event to calendar date.
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    dates: HashMap<EventId, NaiveDate>,
}

impl DateIndex {
    /// Build the index from the event table.
    ///
    /// Listing an event twice is tolerated only when both rows agree.
    pub fn from_events(events: &[EventRow]) -> Result<Self> {
        let mut dates = HashMap::with_capacity(events.len());

        for event in events {
            let date = NaiveDate::parse_from_str(event.date.trim(), "%Y-%m-%d").map_err(
                |source| Error::InvalidDate {
                    event_id: event.event_id,
                    value: event.date.clone(),
                    source,
                },
            )?;

            if let Some(previous) = dates.insert(event.event_id, date) {
                if previous != date {
                    return Err(Error::DuplicateEvent(event.event_id));
                }
            }
        }

        Ok(Self { dates })
    }

    pub fn get(&self, event_id: EventId) -> Option<NaiveDate> {
        self.dates.get(&event_id).copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
