//! Interpolation pass - main orchestrator
//!
//! Builds the lookup tables once, runs every lifter through the inference
//! stages, and writes the results back in the original row order.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::age_class::AgeClass;
use crate::config::InterpolationConfig;
use crate::date_index::DateIndex;
use crate::error::Result;
use crate::inference::{check_consistency, commit, interpolate, Strategy};
use crate::model::{Age, AgeBounds};
use crate::persistence::{Dataset, OutputDataset, OutputRow};
use crate::store::{LifterRecord, ObservationStore};

/// Counts gathered over one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub lifters: u32,
    pub entries: u32,
    /// Lifters with too few observations to interpolate
    pub too_few_observations: u32,
    /// Lifters left untouched because their data contradicts itself
    pub inconsistent: u32,
    pub window_resolved: u32,
    pub birth_year_resolved: u32,
    pub bounds_only: u32,
    pub filled_exact: u32,
    pub filled_uncertain: u32,
    pub bounds_tightened: u32,
}

impl PassStats {
    fn merge(self, other: PassStats) -> PassStats {
        PassStats {
            lifters: self.lifters + other.lifters,
            entries: self.entries + other.entries,
            too_few_observations: self.too_few_observations + other.too_few_observations,
            inconsistent: self.inconsistent + other.inconsistent,
            window_resolved: self.window_resolved + other.window_resolved,
            birth_year_resolved: self.birth_year_resolved + other.birth_year_resolved,
            bounds_only: self.bounds_only + other.bounds_only,
            filled_exact: self.filled_exact + other.filled_exact,
            filled_uncertain: self.filled_uncertain + other.filled_uncertain,
            bounds_tightened: self.bounds_tightened + other.bounds_tightened,
        }
    }
}

/// Result of a pass: the rewritten entry table plus counts
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub entries: Vec<OutputRow>,
    pub stats: PassStats,
}

impl PassOutput {
    pub fn into_dataset(self) -> OutputDataset {
        OutputDataset::new(self.entries)
    }
}

/// Runs interpolation passes with a fixed configuration
#[derive(Debug, Clone)]
pub struct InterpolationPass {
    config: InterpolationConfig,
}

impl InterpolationPass {
    pub fn new(config: InterpolationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Interpolate every lifter in the dataset.
    ///
    /// A broken event reference or unreadable cell aborts the whole pass;
    /// lifters with contradictory data are only skipped.
    pub fn run(&self, dataset: &Dataset) -> Result<PassOutput> {
        let dates = DateIndex::from_events(&dataset.events)?;
        let store = ObservationStore::build(&dataset.entries, &dates)?;
        let records = store.into_records();

        let processed = self.process_all(records)?;

        // Every row belongs to exactly one lifter, so every slot is filled
        let mut slots = vec![(Age::None, AgeBounds::default()); dataset.entries.len()];
        let mut stats = PassStats::default();
        for (record, lifter_stats) in processed {
            stats = stats.merge(lifter_stats);
            for obs in record.observations {
                slots[obs.row] = (obs.age, obs.bounds);
            }
        }

        let entries = dataset
            .entries
            .iter()
            .zip(slots)
            .map(|(entry, (age, bounds))| OutputRow {
                lifter_id: entry.lifter_id,
                age: render_age(&entry.age, age),
                event_id: entry.event_id,
                age_class: AgeClass::from_bounds(bounds),
                extra: entry.extra.clone(),
            })
            .collect();

        info!(
            lifters = stats.lifters,
            entries = stats.entries,
            inconsistent = stats.inconsistent,
            filled_exact = stats.filled_exact,
            filled_uncertain = stats.filled_uncertain,
            bounds_tightened = stats.bounds_tightened,
            "Age interpolation complete"
        );

        Ok(PassOutput { entries, stats })
    }

    fn process_all(&self, records: Vec<LifterRecord>) -> Result<Vec<(LifterRecord, PassStats)>> {
        let config = &self.config;
        if !config.parallel {
            return Ok(records
                .into_iter()
                .map(|record| process_lifter(record, config))
                .collect());
        }

        let run = || {
            records
                .into_par_iter()
                .map(|record| process_lifter(record, config))
                .collect()
        };

        let Some(threads) = config.threads else {
            return Ok(run());
        };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Ok(pool.install(run)),
            Err(e) => {
                warn!("Cannot start a pool of {} workers ({}), using the global pool", threads, e);
                Ok(run())
            }
        }
    }
}

/// Untouched cells are copied through as written; filled ones are rendered.
fn render_age(cell: &str, age: Age) -> String {
    if Age::parse(cell) == Some(age) {
        cell.to_string()
    } else {
        age.to_string()
    }
}

/// Convenience wrapper: one pass over `dataset` with `config`.
pub fn interpolate_dataset(dataset: &Dataset, config: &InterpolationConfig) -> Result<PassOutput> {
    InterpolationPass::new(config.clone())?.run(dataset)
}

/// Check, interpolate and commit one lifter.
///
/// Returns the original record when anything fails.
pub fn process_lifter(
    record: LifterRecord,
    config: &InterpolationConfig,
) -> (LifterRecord, PassStats) {
    let mut stats = PassStats {
        lifters: 1,
        entries: record.len() as u32,
        ..PassStats::default()
    };

    if record.len() < config.min_observations {
        stats.too_few_observations = 1;
        return (record, stats);
    }

    let result = check_consistency(&record).and_then(|()| {
        let interpolation = interpolate(&record)?;
        let updated = commit(&record, &interpolation)?;
        Ok((interpolation.strategy, updated))
    });

    let (strategy, updated) = match result {
        Ok(resolved) => resolved,
        Err(reason) => {
            debug!(lifter = %reason.lifter(), %reason, "Leaving lifter unchanged");
            stats.inconsistent = 1;
            return (record, stats);
        }
    };

    match strategy {
        Strategy::Window => stats.window_resolved = 1,
        Strategy::BirthYear => stats.birth_year_resolved = 1,
        Strategy::BoundsOnly => stats.bounds_only = 1,
    }

    for (before, after) in record.observations.iter().zip(&updated.observations) {
        if !before.age.is_none() {
            continue;
        }
        match after.age {
            Age::Exact(_) => stats.filled_exact += 1,
            Age::Uncertain(_) => stats.filled_uncertain += 1,
            Age::None if after.bounds != before.bounds => stats.bounds_tightened += 1,
            Age::None => {}
        }
    }

    (updated, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{year_offset, EventId, LifterId};
    use crate::persistence::{EntryRow, EventRow};
    use crate::synthetic::{self, SyntheticConfig};
    use std::collections::HashMap;

    fn entry(lifter: u64, age: &str, min: u32, max: u32, event: u64) -> EntryRow {
        EntryRow {
            lifter_id: LifterId(lifter),
            age: age.into(),
            min_age: min,
            max_age: max,
            event_id: EventId(event),
            extra: Default::default(),
        }
    }

    fn event(id: u64, date: &str) -> EventRow {
        EventRow {
            event_id: EventId(id),
            date: date.into(),
        }
    }

    fn events() -> Vec<EventRow> {
        vec![
            event(1, "2010-01-05"),
            event(2, "2011-06-15"),
            event(3, "2012-06-20"),
            event(4, "2013-03-01"),
        ]
    }

    fn run(entries: Vec<EntryRow>) -> PassOutput {
        let dataset = Dataset::new(events(), entries);
        interpolate_dataset(&dataset, &InterpolationConfig::sequential()).unwrap()
    }

    fn output_ages(output: &PassOutput) -> Vec<&str> {
        output.entries.iter().map(|row| row.age.as_str()).collect()
    }

    #[test]
    fn test_single_observation_unchanged() {
        let output = run(vec![entry(1, "", 0, 999, 1)]);
        let row = &output.entries[0];
        assert_eq!(row.age, "");
        assert_eq!(row.age_class, AgeClass::None);
        assert_eq!(row.lifter_id, LifterId(1));
        assert_eq!(row.event_id, EventId(1));
        assert_eq!(output.stats.too_few_observations, 1);
    }

    #[test]
    fn test_three_observation_scenario() {
        // Rows deliberately out of date order
        let output = run(vec![
            entry(1, "21", 21, 21, 3),
            entry(1, "", 0, 999, 1),
            entry(1, "20", 20, 20, 2),
        ]);
        assert_eq!(output_ages(&output), vec!["21", "18.5", "20"]);
        assert_eq!(output.entries[0].age_class, AgeClass::Class19_23);
        // 18 or 19 straddles two brackets; the upper bound decides
        assert_eq!(output.entries[1].age_class, AgeClass::Class19_23);
        assert_eq!(output.stats.birth_year_resolved, 1);
        assert_eq!(output.stats.filled_uncertain, 1);
    }

    #[test]
    fn test_window_scenario() {
        let output = run(vec![
            entry(1, "", 0, 999, 1),
            entry(1, "20", 20, 20, 2),
            entry(1, "22", 22, 22, 3),
            entry(1, "", 0, 999, 4),
        ]);
        // Born 1990 with the birthday in (06-15, 06-20]
        assert_eq!(output_ages(&output), vec!["19", "20", "22", "22"]);
        assert_eq!(output.stats.window_resolved, 1);
        assert_eq!(output.stats.filled_exact, 2);
    }

    #[test]
    fn test_inconsistent_lifter_passes_through() {
        let output = run(vec![
            entry(1, "30", 30, 30, 1),
            entry(1, "", 40, 44, 2),
            entry(1, "25", 0, 999, 3),
            entry(2, "", 0, 999, 1),
            entry(2, "40.5", 0, 999, 4),
        ]);
        assert_eq!(output_ages(&output), vec!["30", "", "25", "37.5", "40.5"]);
        // AgeClass still comes from the original bounds
        assert_eq!(output.entries[1].age_class, AgeClass::Class39_44);
        assert_eq!(output.stats.inconsistent, 1);
        assert_eq!(output.stats.lifters, 2);
    }

    #[test]
    fn test_missing_date_aborts_pass() {
        let dataset = Dataset::new(
            events(),
            vec![entry(1, "20", 0, 999, 1), entry(2, "", 0, 999, 99)],
        );
        let err = interpolate_dataset(&dataset, &InterpolationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingDateReference {
                row: 1,
                event_id: EventId(99)
            }
        ));
    }

    #[test]
    fn test_untouched_cells_copied_verbatim() {
        let output = run(vec![
            entry(1, "20.0", 0, 999, 1),
            entry(2, " 30 ", 30, 30, 1),
            entry(2, "", 40, 44, 2),
            entry(3, "20.0", 20, 20, 2),
            entry(3, "", 0, 999, 4),
        ]);
        // Lifter 1 has one result, lifter 2 contradicts itself
        assert_eq!(output_ages(&output), vec!["20.0", " 30 ", "", "20.0", "21.5"]);
        assert_eq!(output.stats.inconsistent, 1);
        assert_eq!(output.stats.too_few_observations, 1);
    }

    #[test]
    fn test_out_of_range_age_aborts_pass() {
        let dataset = Dataset::new(
            events(),
            vec![entry(1, "4294967295.5", 0, 999, 1), entry(1, "", 0, 999, 2)],
        );
        let err = interpolate_dataset(&dataset, &InterpolationConfig::sequential()).unwrap_err();
        assert!(matches!(err, Error::InvalidAge { row: 0, .. }));
    }

    #[test]
    fn test_output_table_round_trip() {
        let output = run(vec![entry(1, "20", 20, 20, 2), entry(1, "", 0, 999, 1)]);
        let json = output.clone().into_dataset().to_json().unwrap();
        assert!(json.contains("\"AgeClass\""));
        assert!(!json.contains("MinAge"));
        assert!(!json.contains("MaxAge"));

        let restored = OutputDataset::from_json(&json).unwrap();
        assert_eq!(restored.entries, output.entries);
    }

    #[test]
    fn test_extra_columns_preserved() {
        let mut first = entry(1, "20", 20, 20, 2);
        first.extra.insert("Name".into(), serde_json::json!("Jane Doe"));
        let output = run(vec![first, entry(1, "", 0, 999, 3)]);
        assert_eq!(output.entries[0].extra["Name"], serde_json::json!("Jane Doe"));
        assert!(output.entries[1].extra.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = InterpolationConfig {
            min_observations: 0,
            ..InterpolationConfig::default()
        };
        assert!(InterpolationPass::new(config).is_err());
    }

    // ------------------------------------------------------------------
    // Properties over truthful synthetic data
    // ------------------------------------------------------------------

    fn synthetic(lifters: usize, seed: u64) -> synthetic::SyntheticDataset {
        synthetic::generate(&SyntheticConfig {
            lifters,
            seed,
            ..SyntheticConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_filled_ages_match_truth() {
        let data = synthetic(400, 7);
        let dates = DateIndex::from_events(&data.dataset.events).unwrap();
        let output = interpolate_dataset(&data.dataset, &InterpolationConfig::default()).unwrap();
        assert_eq!(output.stats.inconsistent, 0);
        assert!(output.stats.filled_exact > 0);
        assert!(output.stats.filled_uncertain > 0);

        for (input, row) in data.dataset.entries.iter().zip(&output.entries) {
            let birthdate = data.birthdates[&input.lifter_id];
            let date = dates.get(input.event_id).unwrap();
            let truth = synthetic::age_on(birthdate, date);

            match Age::parse(&row.age).unwrap() {
                Age::Exact(age) => assert_eq!(age, truth, "row {:?}", input),
                Age::Uncertain(age) => assert!(age == truth || age + 1 == truth, "row {:?}", input),
                Age::None => assert!(input.age.is_empty()),
            }
        }
    }

    #[test]
    fn test_resolved_bounds_contain_truth_and_agree() {
        let data = synthetic(300, 11);
        let dates = DateIndex::from_events(&data.dataset.events).unwrap();
        let store = ObservationStore::build(&data.dataset.entries, &dates).unwrap();
        let config = InterpolationConfig::sequential();

        for record in store.into_records() {
            let birthdate = data.birthdates[&record.lifter_id];
            let (updated, stats) = process_lifter(record, &config);
            assert_eq!(stats.inconsistent, 0);

            for obs in &updated.observations {
                assert!(obs.bounds.contains(synthetic::age_on(birthdate, obs.date)));
            }

            for pair in updated.observations.windows(2) {
                let (earlier, later) = (&pair[0], &pair[1]);
                let years = year_offset(earlier.date, later.date) as u32;
                if let (Some(min), Some(max)) = (later.bounds.min, earlier.bounds.max) {
                    assert!(min <= max + years + 1);
                }
                if let (Some(max), Some(min)) = (later.bounds.max, earlier.bounds.min) {
                    assert!(max >= min + years);
                }
            }
        }
    }

    #[test]
    fn test_idempotent_when_no_ages_missing() {
        let data = synthetic(300, 3);
        let mut dataset = data.dataset.clone();
        dataset.entries.retain(|entry| !entry.age.is_empty());

        let output = interpolate_dataset(&dataset, &InterpolationConfig::default()).unwrap();
        for (input, row) in dataset.entries.iter().zip(&output.entries) {
            assert_eq!(Age::parse(&input.age), Age::parse(&row.age));
        }
        assert_eq!(output.stats.filled_exact + output.stats.filled_uncertain, 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = synthetic(250, 21);
        let sequential =
            interpolate_dataset(&data.dataset, &InterpolationConfig::sequential()).unwrap();
        let pooled = InterpolationConfig {
            threads: Some(3),
            ..InterpolationConfig::default()
        };
        let parallel = interpolate_dataset(&data.dataset, &pooled).unwrap();
        assert_eq!(sequential.entries, parallel.entries);
        assert_eq!(sequential.stats, parallel.stats);
    }

    #[test]
    fn test_contradiction_leaves_all_ages() {
        // A truthful lifter plus one whose exact ages cannot share a birthday
        let mut entries = vec![
            entry(8, "20", 0, 999, 1),
            entry(8, "", 0, 999, 2),
            entry(8, "20", 0, 999, 4),
        ];
        entries.push(entry(9, "33", 0, 999, 2));
        entries.push(entry(9, "", 0, 999, 3));
        let output = run(entries);

        let by_lifter: HashMap<u64, Vec<&str>> =
            output.entries.iter().fold(HashMap::new(), |mut acc, row| {
                acc.entry(row.lifter_id.0).or_default().push(row.age.as_str());
                acc
            });
        // 20 in January 2010 and still 20 in March 2013
        assert_eq!(by_lifter[&8], vec!["20", "", "20"]);
        assert_eq!(by_lifter[&9], vec!["33", "34.5"]);
        assert_eq!(output.stats.inconsistent, 1);
    }
}
