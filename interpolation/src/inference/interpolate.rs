//! Age interpolation for lifters that passed the consistency checks

use crate::error::Inconsistency;
use crate::inference::{BirthWindow, BirthYearRange, KnownRange};
use crate::inference::birth_window::BirthdayStatus;
use crate::model::{Age, AgeBounds, AgeObservation, Resolution};
use crate::store::LifterRecord;

/// Which evidence drove the interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Exact ages bracket the birthday
    Window,
    /// Ages give a birth year and/or a span with no birthday
    BirthYear,
    /// Only division bounds
    BoundsOnly,
}

/// Resolutions for one lifter, in the same order as its observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    pub strategy: Strategy,
    pub resolutions: Vec<Resolution>,
}

/// Resolve every observation that has no age.
///
/// Observations that already carry an age always come back `Unresolved`.
pub fn interpolate(record: &LifterRecord) -> Result<Interpolation, Inconsistency> {
    let lifter = record.lifter_id;
    let range = BirthYearRange::from_observations(&record.observations)
        .ok_or(Inconsistency::BirthYear { lifter })?;

    if let Some(window) = BirthWindow::estimate(&record.observations) {
        if !range.contains(window.birth_year) {
            return Err(Inconsistency::BirthYear { lifter });
        }
        return resolve_each(record, Strategy::Window, |obs| from_window(&window, obs));
    }

    if record.has_ages() {
        let known = KnownRange::from_observations(&record.observations);
        let approx = record.observations.iter().find_map(|obs| match obs.age {
            Age::Exact(age) => i32::try_from(age).ok().map(|age| obs.year() - age),
            _ => None,
        });
        let anchor = known.zip(approx);
        return resolve_each(record, Strategy::BirthYear, |obs| {
            from_birth_year(&range, anchor, obs)
        });
    }

    resolve_each(record, Strategy::BoundsOnly, |obs| from_bounds(&range, obs))
}

fn resolve_each<F>(
    record: &LifterRecord,
    strategy: Strategy,
    resolve: F,
) -> Result<Interpolation, Inconsistency>
where
    F: Fn(&AgeObservation) -> Option<Resolution>,
{
    let resolutions = record
        .observations
        .iter()
        .map(|obs| {
            if !obs.age.is_none() {
                return Ok(Resolution::Unresolved);
            }
            resolve(obs).ok_or(Inconsistency::ResolutionConflict {
                lifter: record.lifter_id,
                date: obs.date,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Interpolation {
        strategy,
        resolutions,
    })
}

fn from_window(window: &BirthWindow, obs: &AgeObservation) -> Option<Resolution> {
    let years = obs.year() - window.birth_year;
    match window.status(obs.month_day()) {
        BirthdayStatus::NotYet => Resolution::exact(years - 1),
        BirthdayStatus::Passed => Resolution::exact(years),
        BirthdayStatus::Unknown => Resolution::uncertain(years - 1),
    }
}

/// `anchor` is the no-birthday span of the exact ages together with
/// `year - age` shared by all of them.
///
/// That value is the birth year if the birthday comes before the span, one
/// more than it if the birthday comes after.
fn from_birth_year(
    range: &BirthYearRange,
    anchor: Option<(KnownRange, i32)>,
    obs: &AgeObservation,
) -> Option<Resolution> {
    let year = obs.year();
    let month_day = obs.month_day();

    match (range.pinned(), anchor) {
        (Some(birth_year), Some((known, approx))) => {
            let exact = if birth_year == approx {
                (month_day >= known.first).then_some(year - birth_year)
            } else {
                (month_day <= known.last).then_some(year - birth_year - 1)
            };
            match exact {
                Some(age) => Resolution::exact(age),
                None => Resolution::uncertain(year - birth_year - 1),
            }
        }
        (Some(birth_year), None) => Resolution::uncertain(year - birth_year - 1),
        (None, Some((known, approx))) => {
            if known.contains(month_day) {
                Resolution::exact(year - approx)
            } else if month_day < known.first {
                Resolution::uncertain(year - approx - 1)
            } else {
                Resolution::uncertain(year - approx)
            }
        }
        (None, None) => from_bounds(range, obs),
    }
}

fn from_bounds(range: &BirthYearRange, obs: &AgeObservation) -> Option<Resolution> {
    let (lowest, highest) = range.ages_on(obs.date);
    if lowest.is_none() && highest.is_none() {
        return Some(Resolution::Unresolved);
    }

    // A floor of zero or below says nothing
    let min = lowest.filter(|&age| age > 0).map(|age| age as u32);
    let max = match highest {
        Some(age) => Some(u32::try_from(age).ok()?),
        None => None,
    };
    Some(Resolution::Bounded(AgeBounds::new(min, max)))
}

/// Apply an interpolation, producing the lifter's new record.
///
/// Every resolution must agree with the bounds recorded on its observation,
/// or nothing is applied.
pub fn commit(
    record: &LifterRecord,
    interpolation: &Interpolation,
) -> Result<LifterRecord, Inconsistency> {
    let observations = record
        .observations
        .iter()
        .zip(&interpolation.resolutions)
        .map(|(obs, resolution)| {
            let conflict = Inconsistency::ResolutionConflict {
                lifter: record.lifter_id,
                date: obs.date,
            };
            let (age, bounds) = match *resolution {
                Resolution::Unresolved => return Ok(obs.clone()),
                Resolution::Bounded(bounds) => {
                    (obs.age, obs.bounds.intersect(bounds).ok_or(conflict)?)
                }
                Resolution::ResolvedExact(age) => {
                    if !obs.bounds.contains(age) {
                        return Err(conflict);
                    }
                    (Age::Exact(age), AgeBounds::exact(age))
                }
                Resolution::ResolvedUncertain(lower) => {
                    let bounds = obs
                        .bounds
                        .intersect(AgeBounds::new(Some(lower), Some(lower + 1)))
                        .ok_or(conflict)?;
                    match (bounds.min, bounds.max) {
                        (Some(min), Some(max)) if min == max => (Age::Exact(min), bounds),
                        _ => (Age::Uncertain(lower), bounds),
                    }
                }
            };
            Ok(AgeObservation {
                age,
                bounds,
                ..obs.clone()
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LifterRecord {
        lifter_id: record.lifter_id,
        observations,
    })
}
