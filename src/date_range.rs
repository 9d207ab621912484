use std::mem::replace;

use chrono::{Days, NaiveDate};

use crate::error::{LwfError, Result};

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(LwfError::InvalidDateRange { start, end });
        }

        Ok(DateRange(start, end))
    }

    pub fn start(&self) -> NaiveDate {
        self.0
    }

    pub fn end(&self) -> NaiveDate {
        self.1
    }

    /// The same range widened by one day at the start, for the SWE series.
    pub fn with_previous_day(&self) -> DateRange {
        DateRange(previous_day(self.0), self.1)
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + Days::new(1);
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date - Days::new(1)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected a date as YYYY-MM-DD, got `{}`: {}", s, e))
}
