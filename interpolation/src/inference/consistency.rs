//! Consistency checks - can one birthdate explain every observation?

use chrono::NaiveDate;

use crate::error::Inconsistency;
use crate::inference::NormalizedAges;
use crate::model::year_offset;
use crate::store::LifterRecord;

/// Both checks must pass before anything is interpolated.
pub fn check_consistency(record: &LifterRecord) -> Result<(), Inconsistency> {
    check_age_trend(record)?;
    check_birthday(record)
}

/// A value carried forward together with the date it was seen on
#[derive(Debug, Clone, Copy)]
struct Seen<T> {
    value: T,
    date: NaiveDate,
}

/// Walks the observations in date order, checking each against the most
/// recent age, minimum and maximum seen before it.
///
/// Ages grow by the whole years elapsed, plus at most one more for a
/// birthday that fell in the partial year.
pub fn check_age_trend(record: &LifterRecord) -> Result<(), Inconsistency> {
    let lifter = record.lifter_id;
    let mut age: Option<Seen<(i64, i64)>> = None;
    let mut min: Option<Seen<i64>> = None;
    let mut max: Option<Seen<i64>> = None;

    for obs in &record.observations {
        let date = obs.date;
        let conflict = |reason| Inconsistency::AgeTrend { lifter, date, reason };
        let elapsed = |since: NaiveDate| i64::from(year_offset(since, date));

        let interval = obs.age.interval();
        let own_bounds_ok = obs.bounds.is_valid()
            && interval.map_or(true, |(lo, hi)| obs.bounds.contains(lo) || obs.bounds.contains(hi));
        if !own_bounds_ok {
            return Err(Inconsistency::BoundsInverted { lifter, date });
        }

        if let Some((lo, hi)) = interval {
            let (lo, hi) = (i64::from(lo), i64::from(hi));
            if let Some(prev) = age {
                let (prev_lo, prev_hi) = prev.value;
                let years = elapsed(prev.date);
                if hi < prev_lo + years {
                    return Err(conflict("younger than an earlier age"));
                }
                if lo > prev_hi + years + 1 {
                    return Err(conflict("older than an earlier age allows"));
                }
            }
            if let Some(prev) = min {
                if hi < prev.value + elapsed(prev.date) {
                    return Err(conflict("below an earlier minimum"));
                }
            }
            if let Some(prev) = max {
                if lo > prev.value + elapsed(prev.date) + 1 {
                    return Err(conflict("above an earlier maximum"));
                }
            }
        }

        if let (Some(new_min), Some(prev)) = (obs.bounds.min, max) {
            if i64::from(new_min) > prev.value + elapsed(prev.date) + 1 {
                return Err(conflict("minimum above an earlier maximum"));
            }
        }
        if let (Some(new_max), Some(prev)) = (obs.bounds.max, min) {
            if i64::from(new_max) < prev.value + elapsed(prev.date) {
                return Err(conflict("maximum below an earlier minimum"));
            }
        }

        if let Some((lo, hi)) = interval {
            age = Some(Seen {
                value: (i64::from(lo), i64::from(hi)),
                date,
            });
        }
        if let Some(value) = obs.bounds.min {
            min = Some(Seen {
                value: i64::from(value),
                date,
            });
        }
        if let Some(value) = obs.bounds.max {
            max = Some(Seen {
                value: i64::from(value),
                date,
            });
        }
    }

    Ok(())
}

/// Restates every exact age in one reference year and checks that, read in
/// month-day order, they step up at most once and by exactly one year.
pub fn check_birthday(record: &LifterRecord) -> Result<(), Inconsistency> {
    let Some(normalized) = NormalizedAges::from_observations(&record.observations) else {
        return Ok(());
    };
    let conflict = Inconsistency::Birthday {
        lifter: record.lifter_id,
    };

    for pair in normalized.points.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.age < prev.age {
            return Err(conflict);
        }
        if next.month_day == prev.month_day && next.age != prev.age {
            return Err(conflict);
        }
    }

    if let (Some(first), Some(last)) = (normalized.points.first(), normalized.points.last()) {
        if last.age - first.age > 1 {
            return Err(conflict);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::test_support::{obs, record};

    #[test]
    fn test_steady_ages_pass() {
        let lifter = record(vec![
            obs("20", "2011-06-15", 20, 20),
            obs("21", "2012-06-20", 21, 21),
            obs("", "2013-01-05", 0, 999),
            obs("23", "2014-07-01", 0, 999),
        ]);
        assert_eq!(check_consistency(&lifter), Ok(()));
    }

    #[test]
    fn test_age_going_backwards() {
        let lifter = record(vec![obs("25", "2010-05-01", 0, 999), obs("23", "2011-06-01", 0, 999)]);
        assert!(matches!(
            check_age_trend(&lifter),
            Err(Inconsistency::AgeTrend { .. })
        ));
    }

    #[test]
    fn test_age_jumping_ahead() {
        // One year apart allows at most two birthdays' worth of change
        let lifter = record(vec![obs("25", "2010-05-01", 0, 999), obs("28", "2011-06-01", 0, 999)]);
        assert!(check_age_trend(&lifter).is_err());

        let lifter = record(vec![obs("25", "2010-05-01", 0, 999), obs("27", "2011-06-01", 0, 999)]);
        assert!(check_age_trend(&lifter).is_ok());
    }

    #[test]
    fn test_uncertain_age_compared_as_interval() {
        // 20.5 allows 21, which follows an exact 20 a year earlier
        let lifter = record(vec![
            obs("20", "2010-06-01", 0, 999),
            obs("20.5", "2011-06-01", 0, 999),
        ]);
        assert!(check_age_trend(&lifter).is_ok());

        let lifter = record(vec![
            obs("22", "2010-06-01", 0, 999),
            obs("20.5", "2011-06-01", 0, 999),
        ]);
        assert!(check_age_trend(&lifter).is_err());
    }

    #[test]
    fn test_division_bounds() {
        // Junior division then an open division a year later
        let lifter = record(vec![obs("", "2010-05-01", 20, 23), obs("", "2011-05-01", 24, 999)]);
        assert!(check_age_trend(&lifter).is_ok());

        // Minimum far beyond an earlier maximum
        let lifter = record(vec![obs("", "2010-05-01", 0, 17), obs("", "2011-05-01", 40, 999)]);
        assert!(check_age_trend(&lifter).is_err());

        // Maximum below an earlier minimum
        let lifter = record(vec![obs("", "2010-05-01", 40, 999), obs("", "2011-05-01", 0, 39)]);
        assert!(check_age_trend(&lifter).is_err());
    }

    #[test]
    fn test_missing_bounds_never_constrain() {
        // A leading open division must not drag later ages towards zero
        let lifter = record(vec![obs("", "2000-05-01", 0, 999), obs("30", "2010-05-01", 0, 999)]);
        assert!(check_age_trend(&lifter).is_ok());
    }

    #[test]
    fn test_own_bounds_violated() {
        let lifter = record(vec![obs("30", "2010-05-01", 20, 23)]);
        assert!(matches!(
            check_age_trend(&lifter),
            Err(Inconsistency::BoundsInverted { .. })
        ));

        let lifter = record(vec![obs("", "2010-05-01", 30, 20)]);
        assert!(check_age_trend(&lifter).is_err());
    }

    #[test]
    fn test_two_birthdays_rejected() {
        // Each neighbouring pair is plausible, but 20 all through 2010 and
        // still 20 in June 2011 leaves no day for the birthday.
        let lifter = record(vec![
            obs("20", "2010-01-10", 0, 999),
            obs("20", "2010-12-20", 0, 999),
            obs("20", "2011-06-01", 0, 999),
        ]);
        assert!(check_age_trend(&lifter).is_ok());
        assert_eq!(
            check_birthday(&lifter),
            Err(Inconsistency::Birthday {
                lifter: lifter.lifter_id
            })
        );
    }

    #[test]
    fn test_same_month_day_must_agree() {
        let lifter = record(vec![obs("20", "2010-06-15", 0, 999), obs("22", "2011-06-15", 0, 999)]);
        assert!(check_birthday(&lifter).is_err());
    }

    #[test]
    fn test_single_birthday_transition_passes() {
        let lifter = record(vec![obs("20", "2011-06-15", 0, 999), obs("22", "2012-06-20", 0, 999)]);
        assert!(check_birthday(&lifter).is_ok());
    }
}
