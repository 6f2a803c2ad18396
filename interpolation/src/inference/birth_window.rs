//! Birthday estimation from exact ages and birthyear constraints

use chrono::{Datelike, NaiveDate};

use crate::inference::NormalizedAges;
use crate::model::{Age, AgeObservation, MonthDay};

/// Where the lifter's birthday falls within the year.
///
/// The birthday is after `after` and no later than `until`: on `after` the
/// lifter was still one year younger, on `until` they were already older.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthWindow {
    pub after: MonthDay,
    pub until: MonthDay,
    pub birth_year: i32,
}

/// Which side of the birthday a date falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirthdayStatus {
    NotYet,
    Passed,
    Unknown,
}

impl BirthWindow {
    /// Find the month-days where the normalized exact ages step from `k` to
    /// `k + 1`.
    ///
    /// Needs at least two exact ages; `None` when they never step up.
    pub fn estimate(observations: &[AgeObservation]) -> Option<BirthWindow> {
        let normalized = NormalizedAges::from_observations(observations)?;
        let (first, rest) = normalized.points.split_first()?;

        let lower = first.age;
        let mut after = first.month_day;
        for point in rest {
            if point.age == lower {
                after = point.month_day;
            } else if point.age == lower + 1 {
                return Some(BirthWindow {
                    after,
                    until: point.month_day,
                    birth_year: normalized.reference_year - (lower + 1),
                });
            }
        }
        None
    }

    pub fn status(&self, month_day: MonthDay) -> BirthdayStatus {
        if month_day <= self.after {
            BirthdayStatus::NotYet
        } else if month_day >= self.until {
            BirthdayStatus::Passed
        } else {
            BirthdayStatus::Unknown
        }
    }
}

/// Span of month-days over which the exact ages show no birthday.
///
/// Every exact age restates to the same age at any month-day in
/// `[first, last]`; the birthday lies outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownRange {
    pub first: MonthDay,
    pub last: MonthDay,
}

impl KnownRange {
    pub fn from_observations(observations: &[AgeObservation]) -> Option<KnownRange> {
        let normalized = NormalizedAges::from_observations(observations)?;
        let first = normalized.points.first()?.month_day;
        let last = normalized.points.last()?.month_day;
        Some(KnownRange { first, last })
    }

    pub fn contains(&self, month_day: MonthDay) -> bool {
        self.first <= month_day && month_day <= self.last
    }
}

/// Inclusive range of possible birth years. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BirthYearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl BirthYearRange {
    /// Intersect the birthyear constraints of every observation.
    ///
    /// `None` when no birth year satisfies all of them.
    pub fn from_observations(observations: &[AgeObservation]) -> Option<BirthYearRange> {
        let mut range = BirthYearRange::default();

        for obs in observations {
            let year = obs.year();
            // Birth year when the birthday has passed, as of `year`
            let born = |age: u32| year.checked_sub(i32::try_from(age).ok()?);
            match obs.age {
                Age::Exact(age) => {
                    let birth_year = born(age)?;
                    range.narrow_min(birth_year.checked_sub(1)?);
                    range.narrow_max(birth_year);
                }
                Age::Uncertain(age) => {
                    let birth_year = born(age)?.checked_sub(1)?;
                    range.narrow_min(birth_year);
                    range.narrow_max(birth_year);
                }
                Age::None => {}
            }
            if let Some(min_age) = obs.bounds.min {
                range.narrow_max(born(min_age)?);
            }
            if let Some(max_age) = obs.bounds.max {
                range.narrow_min(born(max_age)?.checked_sub(1)?);
            }
        }

        range.is_valid().then_some(range)
    }

    fn narrow_min(&mut self, year: i32) {
        self.min = Some(self.min.map_or(year, |min| min.max(year)));
    }

    fn narrow_max(&mut self, year: i32) {
        self.max = Some(self.max.map_or(year, |max| max.min(year)));
    }

    pub fn is_valid(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    /// The birth year, when only one remains possible
    pub fn pinned(&self) -> Option<i32> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => Some(min),
            _ => None,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
    }

    /// Age range on `date` implied by this birthyear range, as signed years.
    pub fn ages_on(&self, date: NaiveDate) -> (Option<i32>, Option<i32>) {
        let year = date.year();
        (
            self.max.map(|max| year - max - 1),
            self.min.map(|min| year - min),
        )
    }
}
