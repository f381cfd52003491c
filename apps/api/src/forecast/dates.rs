//! Best-effort date display helpers. Anything that does not parse is passed through unchanged.

use chrono::NaiveDate;

const ISO_FORMAT: &str = "%Y-%m-%d";

pub fn parse_iso(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), ISO_FORMAT).ok()
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// `2025-09-14` → `14/09/2025`.
pub fn display_date(value: &str) -> String {
    match parse_iso(value) {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => value.to_string(),
    }
}

/// `2025-09-14` → `14-09-2025`, used in download file names where `/` is not allowed.
pub fn file_date(value: &str) -> String {
    match parse_iso(value) {
        Some(date) => date.format("%d-%m-%Y").to_string(),
        None => value.replace('/', "-"),
    }
}

/// Day-month display for dateless ranges: `03-21` or `2000-03-21` → `21/03`.
pub fn display_day_month(value: &str) -> String {
    match day_month(value) {
        Some((month, day)) => format!("{day:02}/{month:02}"),
        None => value.to_string(),
    }
}

/// Extracts (month, day) from `MM-DD` or `YYYY-MM-DD`.
pub fn day_month(value: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = value.trim().split('-').collect();
    let (month, day) = match parts.as_slice() {
        [month, day] => (month, day),
        [_, month, day] => (month, day),
        _ => return None,
    };
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    // 2000 is a leap year, so 29 February validates.
    NaiveDate::from_ymd_opt(2000, month, day).map(|_| (month, day))
}
