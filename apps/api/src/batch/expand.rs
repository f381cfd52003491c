//! Period Expander: turns a birth-year span into the ordered date ranges a
//! batch generates one document for.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("birth year must be 'YYYY' or 'YYYY-YYYY', got '{0}'")]
    InvalidYear(String),
}

/// An inclusive span of birth dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Parses `"1980"` or `"1980-1982"`. A reversed span is put back in order.
pub fn parse_birth_years(raw: &str) -> Result<(i32, i32), ExpandError> {
    let invalid = || ExpandError::InvalidYear(raw.to_string());
    let parse_year = |s: &str| -> Result<i32, ExpandError> {
        let s = s.trim();
        if s.len() != 4 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse().map_err(|_| invalid())
    };

    let (first, last) = match raw.trim().split_once('-') {
        Some((a, b)) => (parse_year(a)?, parse_year(b)?),
        None => {
            let year = parse_year(raw)?;
            (year, year)
        }
    };
    Ok((first.min(last), first.max(last)))
}

/// One span per month of every year in the inclusive range, or two when
/// `split_month` is set (days 1–15 and 16–last day).
pub fn expand_birth_years(raw: &str, split_month: bool) -> Result<Vec<DateSpan>, ExpandError> {
    let (first, last) = parse_birth_years(raw)?;
    let invalid = || ExpandError::InvalidYear(raw.to_string());

    let mut spans = Vec::with_capacity(((last - first + 1) * 24) as usize);
    for year in first..=last {
        for month in 1..=12 {
            let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
            let end = last_day_of_month(start).ok_or_else(invalid)?;
            if split_month {
                let mid = start.with_day(15).ok_or_else(invalid)?;
                let second = start.with_day(16).ok_or_else(invalid)?;
                spans.push(DateSpan { start, end: mid });
                spans.push(DateSpan { start: second, end });
            } else {
                spans.push(DateSpan { start, end });
            }
        }
    }
    Ok(spans)
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.and_then(|d| d.pred_opt())
}
