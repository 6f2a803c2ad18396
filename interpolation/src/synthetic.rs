//! Synthetic Dataset Generation
//!
//! Produces entry and event tables from randomly drawn birthdates, exposing
//! each lifter's age the ways real results do: an exact age, a birthyear
//! `.5` age, division bounds, or nothing at all. The birthdates are kept so
//! callers can check interpolated ages against the truth.

use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{year_offset, EventId, LifterId, NO_MAX_AGE, NO_MIN_AGE};
use crate::persistence::{Dataset, EntryRow, EventRow};

/// Events fall between 1995-01-01 and 2020-12-31 (days since 1970-01-01)
const EVENT_DAYS: std::ops::Range<i64> = 9_131..18_628;
/// Birthdates fall between 1950-01-01 and 2005-12-31
const BIRTH_DAYS: std::ops::Range<i64> = -7_305..13_149;
/// Nobody younger than this competes
const YOUNGEST_LIFTER: i32 = 10;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "Michael", "Jennifer", "David",
    "Linda", "Thomas", "Sarah", "Daniel", "Karen", "Anthony", "Emily",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Garcia", "Miller", "Davis", "Martinez", "Wilson",
    "Anderson", "Taylor", "Moore", "Lee", "Walker", "Young", "King",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub lifters: usize,
    /// Events in the shared pool; `None` picks one per four lifters
    pub events: Option<usize>,
    /// Mean of the Poisson draw for extra observations per lifter
    pub mean_observations: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            lifters: 1_000,
            events: None,
            mean_observations: 3.0,
            seed: 0,
        }
    }
}

/// A generated dataset together with every lifter's true birthdate
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub dataset: Dataset,
    pub birthdates: HashMap<LifterId, NaiveDate>,
}

/// True age on `date` for someone born on `birthdate`
pub fn age_on(birthdate: NaiveDate, date: NaiveDate) -> u32 {
    year_offset(birthdate, date).max(0) as u32
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::default() + Duration::days(offset)
}

/// Generate a dataset. The same config always yields the same tables.
pub fn generate(config: &SyntheticConfig) -> Result<SyntheticDataset> {
    let observations = Poisson::new(config.mean_observations).map_err(|e| {
        Error::Config(format!(
            "invalid mean_observations {}: {}",
            config.mean_observations, e
        ))
    })?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let event_count = config.events.unwrap_or(config.lifters / 4).max(8);
    let event_dates: Vec<NaiveDate> = (0..event_count)
        .map(|_| day(rng.gen_range(EVENT_DAYS)))
        .collect();
    let events = event_dates
        .iter()
        .enumerate()
        .map(|(i, date)| EventRow {
            event_id: EventId(i as u64 + 1),
            date: date.format("%Y-%m-%d").to_string(),
        })
        .collect();

    let mut entries = Vec::new();
    let mut birthdates = HashMap::with_capacity(config.lifters);

    for n in 0..config.lifters {
        let lifter_id = LifterId(n as u64 + 1);
        let birthdate = day(rng.gen_range(BIRTH_DAYS));
        birthdates.insert(lifter_id, birthdate);

        let name = format!(
            "{} {}",
            FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
            LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
        );

        let count = observations.sample(&mut rng) as usize + 1;
        for _ in 0..count {
            let index = rng.gen_range(0..event_count);
            let date = event_dates[index];
            if year_offset(birthdate, date) < YOUNGEST_LIFTER {
                continue;
            }

            let mut entry = observe(&mut rng, birthdate, date);
            entry.lifter_id = lifter_id;
            entry.event_id = EventId(index as u64 + 1);
            entry.extra.insert("Name".into(), serde_json::json!(name));
            entries.push(entry);
        }
    }

    // Interleave lifters the way a real results table does
    entries.shuffle(&mut rng);

    Ok(SyntheticDataset {
        dataset: Dataset::new(events, entries),
        birthdates,
    })
}

/// Expose the true age on `date` in one of the ways results record it.
fn observe(rng: &mut StdRng, birthdate: NaiveDate, date: NaiveDate) -> EntryRow {
    let age = age_on(birthdate, date);
    let mut entry = EntryRow {
        lifter_id: LifterId(0),
        age: String::new(),
        min_age: NO_MIN_AGE,
        max_age: NO_MAX_AGE,
        event_id: EventId(0),
        extra: Default::default(),
    };

    match rng.gen_range(0..100) {
        // Exact age, sometimes with matching bounds
        0..=24 => {
            entry.age = age.to_string();
            if rng.gen_bool(0.5) {
                entry.min_age = age;
                entry.max_age = age;
            }
        }
        // Only the birth year is known
        25..=44 => {
            let years = date.year() - birthdate.year() - 1;
            entry.age = format!("{}.5", years);
        }
        // Division bounds, either end possibly open
        45..=69 => {
            if rng.gen_bool(0.8) {
                entry.min_age = age.saturating_sub(rng.gen_range(0..3)).max(1);
            }
            if rng.gen_bool(0.8) {
                entry.max_age = age + rng.gen_range(0..4);
            }
        }
        _ => {}
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_index::DateIndex;
    use crate::model::{Age, AgeBounds};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on() {
        let birthdate = ymd(1990, 6, 17);
        assert_eq!(age_on(birthdate, ymd(2010, 6, 16)), 19);
        assert_eq!(age_on(birthdate, ymd(2010, 6, 17)), 20);
        assert_eq!(age_on(birthdate, ymd(2010, 12, 31)), 20);
    }

    #[test]
    fn test_day_offsets() {
        assert_eq!(day(EVENT_DAYS.start), ymd(1995, 1, 1));
        assert_eq!(day(EVENT_DAYS.end - 1), ymd(2020, 12, 31));
        assert_eq!(day(BIRTH_DAYS.start), ymd(1950, 1, 1));
        assert_eq!(day(BIRTH_DAYS.end - 1), ymd(2005, 12, 31));
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let config = SyntheticConfig {
            lifters: 50,
            seed: 42,
            ..SyntheticConfig::default()
        };
        let a = generate(&config).unwrap();
        let b = generate(&config).unwrap();
        assert_eq!(a.dataset.entries, b.dataset.entries);
        assert_eq!(a.dataset.events, b.dataset.events);
        assert_eq!(a.birthdates.len(), 50);
    }

    #[test]
    fn test_observations_are_truthful() {
        let data = generate(&SyntheticConfig {
            lifters: 200,
            seed: 5,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let dates = DateIndex::from_events(&data.dataset.events).unwrap();
        assert!(!data.dataset.entries.is_empty());

        for entry in &data.dataset.entries {
            let date = dates.get(entry.event_id).unwrap();
            let truth = age_on(data.birthdates[&entry.lifter_id], date);
            assert!(truth >= YOUNGEST_LIFTER as u32);

            match Age::parse(&entry.age).unwrap() {
                Age::Exact(age) => assert_eq!(age, truth),
                Age::Uncertain(age) => assert!(age == truth || age + 1 == truth),
                Age::None => {}
            }
            let bounds = AgeBounds::from_sentinels(entry.min_age, entry.max_age);
            assert!(bounds.contains(truth));
        }
    }

    #[test]
    fn test_invalid_mean_rejected() {
        let config = SyntheticConfig {
            mean_observations: -1.0,
            ..SyntheticConfig::default()
        };
        assert!(matches!(generate(&config), Err(Error::Config(_))));
    }
}
