//! Core data types shared by every stage of the pass

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LifterId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for LifterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Calendar
// ============================================================================

/// A year-less date. Orders month first, so it sorts like a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.month(), date.day())
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Whole years elapsed between two dates.
///
/// One less than the difference of years when `to` falls earlier in its
/// year than `from` does in its own.
pub fn year_offset(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if MonthDay::of(to) < MonthDay::of(from) {
        years -= 1;
    }
    years
}

// ============================================================================
// Age
// ============================================================================

/// A recorded age.
///
/// `Uncertain(n)` is written `n.5`: the lifter was either `n` or `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Age {
    #[default]
    None,
    Exact(u32),
    Uncertain(u32),
}

impl Age {
    /// Parses an `Age` cell: empty, `NN`, `NN.0` or `NN.5`.
    ///
    /// Ages from the "no upper bound" sentinel upwards are rejected.
    pub fn parse(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if cell.is_empty() {
            return Some(Age::None);
        }

        let (whole, frac) = cell.split_once('.').unwrap_or((cell, ""));
        let whole: u32 = whole.parse().ok()?;
        if whole >= NO_MAX_AGE {
            return None;
        }
        match frac.trim_end_matches('0') {
            "" => Some(Age::Exact(whole)),
            "5" => Some(Age::Uncertain(whole)),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Age::None)
    }

    /// The closed range of integer ages this value allows.
    pub fn interval(&self) -> Option<(u32, u32)> {
        match *self {
            Age::None => None,
            Age::Exact(n) => Some((n, n)),
            Age::Uncertain(n) => Some((n, n.saturating_add(1))),
        }
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Age::None => Ok(()),
            Age::Exact(n) => write!(f, "{}", n),
            Age::Uncertain(n) => write!(f, "{}.5", n),
        }
    }
}

/// Sentinel meaning "no lower bound" in the MinAge column
pub const NO_MIN_AGE: u32 = 0;
/// Sentinel meaning "no upper bound" in the MaxAge column
pub const NO_MAX_AGE: u32 = 999;

/// Inclusive age bounds, typically from an age division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AgeBounds {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl AgeBounds {
    pub const fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub const fn exact(age: u32) -> Self {
        Self::new(Some(age), Some(age))
    }

    /// Converts the table's sentinel form (`0` and `999` mean "no bound").
    pub fn from_sentinels(min: u32, max: u32) -> Self {
        Self {
            min: (min != NO_MIN_AGE).then_some(min),
            max: (max != NO_MAX_AGE).then_some(max),
        }
    }

    pub fn to_sentinels(self) -> (u32, u32) {
        (self.min.unwrap_or(NO_MIN_AGE), self.max.unwrap_or(NO_MAX_AGE))
    }

    pub fn is_valid(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min.map_or(true, |min| age >= min) && self.max.map_or(true, |max| age <= max)
    }

    /// Tightest bounds satisfying both, or `None` when they are disjoint.
    pub fn intersect(self, other: AgeBounds) -> Option<AgeBounds> {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let bounds = AgeBounds { min, max };
        bounds.is_valid().then_some(bounds)
    }
}

impl fmt::Display for AgeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, max) = self.to_sentinels();
        write!(f, "[{}, {}]", min, max)
    }
}

// ============================================================================
// Observations
// ============================================================================

/// One entry's age information, resolved to the date of its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeObservation {
    /// Position of the entry in the input table
    pub row: usize,
    pub event_id: EventId,
    pub date: NaiveDate,
    pub age: Age,
    pub bounds: AgeBounds,
}

impl AgeObservation {
    pub fn month_day(&self) -> MonthDay {
        MonthDay::of(self.date)
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// What the interpolator concluded about one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing new is known
    Unresolved,
    /// No age, but tighter bounds
    Bounded(AgeBounds),
    ResolvedExact(u32),
    /// `n.5`: either `n` or `n + 1`
    ResolvedUncertain(u32),
}

impl Resolution {
    /// Builds a resolution from a signed year count, rejecting negative ages.
    pub(crate) fn exact(age: i32) -> Option<Self> {
        u32::try_from(age).ok().map(Resolution::ResolvedExact)
    }

    /// Uncertain between `lower` and `lower + 1`.
    pub(crate) fn uncertain(lower: i32) -> Option<Self> {
        u32::try_from(lower).ok().map(Resolution::ResolvedUncertain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_age_parse() {
        assert_eq!(Age::parse(""), Some(Age::None));
        assert_eq!(Age::parse("  "), Some(Age::None));
        assert_eq!(Age::parse("23"), Some(Age::Exact(23)));
        assert_eq!(Age::parse("23.0"), Some(Age::Exact(23)));
        assert_eq!(Age::parse("23.5"), Some(Age::Uncertain(23)));
        assert_eq!(Age::parse("23.50"), Some(Age::Uncertain(23)));
        assert_eq!(Age::parse("23.25"), None);
        assert_eq!(Age::parse("-4"), None);
        assert_eq!(Age::parse("998.5"), Some(Age::Uncertain(998)));
        assert_eq!(Age::parse("999"), None);
        assert_eq!(Age::parse("4294967295.5"), None);
        assert_eq!(Age::parse("4294967296"), None);
        assert_eq!(Age::parse("abc"), None);
    }

    #[test]
    fn test_age_display() {
        assert_eq!(Age::None.to_string(), "");
        assert_eq!(Age::Exact(7).to_string(), "7");
        assert_eq!(Age::Uncertain(40).to_string(), "40.5");
    }

    #[test]
    fn test_year_offset_respects_month_day() {
        assert_eq!(year_offset(date("2010-06-15"), date("2011-06-15")), 1);
        assert_eq!(year_offset(date("2010-06-15"), date("2011-06-14")), 0);
        assert_eq!(year_offset(date("2010-06-15"), date("2010-12-31")), 0);
        assert_eq!(year_offset(date("2010-01-05"), date("2013-01-04")), 2);
    }

    #[test]
    fn test_bounds_sentinels() {
        let open = AgeBounds::from_sentinels(0, 999);
        assert_eq!(open, AgeBounds::default());
        assert_eq!(open.to_sentinels(), (0, 999));

        let division = AgeBounds::from_sentinels(20, 23);
        assert_eq!(division, AgeBounds::new(Some(20), Some(23)));
        assert!(division.contains(21));
        assert!(!division.contains(24));
    }

    #[test]
    fn test_bounds_intersect() {
        let a = AgeBounds::new(Some(20), None);
        let b = AgeBounds::new(None, Some(23));
        assert_eq!(a.intersect(b), Some(AgeBounds::new(Some(20), Some(23))));
        assert_eq!(AgeBounds::exact(19).intersect(a), None);
        assert_eq!(
            AgeBounds::default().intersect(AgeBounds::default()),
            Some(AgeBounds::default())
        );
    }

    #[test]
    fn test_month_day_order() {
        assert!(MonthDay::new(1, 31) < MonthDay::new(2, 1));
        assert_eq!(MonthDay::of(date("2012-06-20")).to_string(), "06-20");
    }
}
