use chrono::{Days, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// A half-open UTC timestamp window parsed from `YYYY-MM-DD` or
/// `YYYY-MM-DD..YYYY-MM-DD`.
///
/// Bounds are held as ISO-8601 strings and compared lexicographically
/// against advisory timestamps, which share the same fixed-width format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    expr: String,
    start: String,
    end: String,
}

impl DateFilter {
    /// Parses a filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidDateFilter`] for anything that is not a
    /// valid calendar date or date range, and for ranges whose start is
    /// after their end.
    ///
    /// # Example
    ///
    /// ```
    /// use advisory_index::query::DateFilter;
    ///
    /// let filter = DateFilter::parse("2026-01-01..2026-01-31").unwrap();
    /// assert!(filter.matches("2026-01-31T23:59:59Z"));
    /// assert!(!filter.matches("2026-02-01T00:00:00Z"));
    /// ```
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidDateFilter(input.to_string());
        let trimmed = input.trim();

        let (start, end) = match trimmed.split_once("..") {
            Some((start, end)) => (
                parse_day(start).ok_or_else(invalid)?,
                parse_day(end).ok_or_else(invalid)?,
            ),
            None => {
                let day = parse_day(trimmed).ok_or_else(invalid)?;
                (day, day)
            }
        };

        if start > end {
            return Err(invalid());
        }

        let end_exclusive = end.checked_add_days(Days::new(1)).ok_or_else(invalid)?;
        let expr = if start == end {
            start.format("%Y-%m-%d").to_string()
        } else {
            format!("{}..{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        };

        Ok(Self {
            expr,
            start: day_start(start),
            end: day_start(end_exclusive),
        })
    }

    /// The filter in its input grammar, e.g. `2026-01-01..2026-01-31`.
    pub fn as_expr(&self) -> &str {
        &self.expr
    }

    /// True if `timestamp` falls within `[start, end)`.
    pub fn matches(&self, timestamp: &str) -> bool {
        timestamp >= self.start.as_str() && timestamp < self.end.as_str()
    }
}

impl FromStr for DateFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Strict `YYYY-MM-DD`: exactly ten characters, zero-padded, a real date.
fn parse_day(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn day_start(day: NaiveDate) -> String {
    format!("{}T00:00:00Z", day.format("%Y-%m-%d"))
}
