//! Calendar month arithmetic shared by the dues ledger and the status evaluator.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Earliest year accepted for a dues period.
pub const MIN_YEAR: i32 = 2000;
/// Latest year accepted for a dues period.
pub const MAX_YEAR: i32 = 2100;

/// A calendar month of a specific year. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    /// Calendar year
    pub year: i32,
    /// Month of the year, 1-12
    pub month: u32,
}

impl YearMonth {
    /// Builds a period, rejecting months outside 1-12 and years outside
    /// [`MIN_YEAR`]..=[`MAX_YEAR`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidPeriod`] for out-of-range input.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::InvalidPeriod { month, year });
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following month, wrapping December into January of the next year.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Every month from `from` through `to`, both inclusive. Empty when `from` is
/// after `to`.
#[must_use]
pub fn months_between(from: YearMonth, to: YearMonth) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = from;
    while current <= to {
        months.push(current);
        current = current.next();
    }
    months
}
