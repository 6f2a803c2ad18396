//! Inference stages - run once per lifter
//!
//! Consistency checks gate the interpolator; the birth window and the
//! known-range estimates feed it.

pub mod birth_window;
pub mod consistency;
pub mod interpolate;

pub use birth_window::{BirthWindow, BirthYearRange, KnownRange};
pub use consistency::{check_age_trend, check_birthday, check_consistency};
pub use interpolate::{commit, interpolate, Interpolation, Strategy};

use crate::model::{Age, AgeObservation, MonthDay};

/// An exact age restated as of the same month-day in a reference year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedAge {
    pub month_day: MonthDay,
    pub age: i32,
}

/// Exact ages sorted by month-day, all shifted into one reference year.
///
/// For a single birthdate the ages read `k - 1` before the birthday and `k`
/// from it onwards, so any other shape is a contradiction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAges {
    pub reference_year: i32,
    pub points: Vec<NormalizedAge>,
}

impl NormalizedAges {
    /// `None` when no observation carries an exact age, or one is too
    /// large to restate.
    pub fn from_observations(observations: &[AgeObservation]) -> Option<Self> {
        let mut exact: Vec<(MonthDay, i32, i32)> = observations
            .iter()
            .filter_map(|obs| match obs.age {
                Age::Exact(age) => Some(
                    i32::try_from(age)
                        .ok()
                        .map(|age| (obs.month_day(), obs.year(), age)),
                ),
                _ => None,
            })
            .collect::<Option<_>>()?;
        // Stable, so equal month-days stay in date order
        exact.sort_by_key(|&(month_day, _, _)| month_day);

        let reference_year = exact.first()?.1;
        let points = exact
            .into_iter()
            .map(|(month_day, year, age)| NormalizedAge {
                month_day,
                age: age.saturating_add(reference_year - year),
            })
            .collect();

        Some(Self {
            reference_year,
            points,
        })
    }
}
