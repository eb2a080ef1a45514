//! Calendar arithmetic on plain dates: month lengths, clamped day-of-month,
//! month stepping and reporting periods.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of days in `month` of `year` (1-based month).
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Date with `day` clamped down to the last valid day of the month.
///
/// Day 31 in April resolves to April 30; it never rolls into May.
pub fn clamped_date(year: i32, month: u32, day: u32) -> DomainResult<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DomainError::invariant(format!("date out of range: {year}-{month}-{day}")))
}

/// Months since year 0, a linear index for month arithmetic.
pub fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

/// Inverse of [`month_index`]: (year, 1-based month).
pub fn from_month_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

/// Shift `date` by `months`, keeping the day-of-month and clamping it to the
/// target month's length.
pub fn shift_months(date: NaiveDate, months: i64) -> DomainResult<NaiveDate> {
    let (year, month) = from_month_index(month_index(date) + months);
    clamped_date(year, month, date.day())
}

/// Inclusive date range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::validation("end", "date range ends before it starts"));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One calendar month, the reporting period of the income statement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation("month", "must be between 1 and 12"));
        }
        if !(1..=9999).contains(&year) {
            return Err(DomainError::validation("year", "must be between 1 and 9999"));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, days_in_month(self.year, self.month))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.last_day(),
        }
    }

    /// The twelve months of `year`, January first.
    pub fn months_of(year: i32) -> DomainResult<Vec<Period>> {
        (1..=12).map(|m| Period::new(year, m)).collect()
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_lengths_follow_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn clamped_date_never_rolls_forward() {
        assert_eq!(clamped_date(2024, 4, 31).unwrap(), d(2024, 4, 30));
        assert_eq!(clamped_date(2023, 2, 30).unwrap(), d(2023, 2, 28));
        assert_eq!(clamped_date(2024, 1, 31).unwrap(), d(2024, 1, 31));
    }

    #[test]
    fn shift_months_crosses_years() {
        assert_eq!(shift_months(d(2024, 11, 30), 3).unwrap(), d(2025, 2, 28));
        assert_eq!(shift_months(d(2024, 1, 15), -1).unwrap(), d(2023, 12, 15));
    }

    #[test]
    fn period_bounds_and_validation() {
        let p = Period::new(2024, 2).unwrap();
        assert_eq!(p.first_day(), d(2024, 2, 1));
        assert_eq!(p.last_day(), d(2024, 2, 29));
        assert_eq!(p.to_string(), "02/2024");
        assert_eq!(Period::new(2024, 13).unwrap_err().field(), Some("month"));
        assert_eq!(Period::new(2024, 0).unwrap_err().field(), Some("month"));
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(d(2024, 2, 1), d(2024, 1, 1)).is_err());
        let r = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert!(r.contains(d(2024, 1, 31)));
        assert!(!r.contains(d(2024, 2, 1)));
    }

    proptest! {
        #[test]
        fn clamped_date_stays_in_requested_month(year in 1990i32..2100, month in 1u32..=12, day in 1u32..=31) {
            let date = clamped_date(year, month, day).unwrap();
            prop_assert_eq!(date.month(), month);
            prop_assert_eq!(date.year(), year);
            prop_assert!(date.day() <= day);
        }

        #[test]
        fn month_index_round_trips(year in 1i32..9999, month in 1u32..=12) {
            let idx = month_index(d(year, month, 1));
            prop_assert_eq!(from_month_index(idx), (year, month));
        }
    }
}
