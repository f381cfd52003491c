//! Forecast period labels: recognizes the shapes the front-end offers
//! ("August 2025", "September,October 2025", "autumn 2025", "Q1 2025", "2025",
//! "01/09/2025") so the prompt can say which months a label covers.
//!
//! Unrecognized labels are still used verbatim; classification only adds detail.

use chrono::{Month, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "spring" => Some(Season::Spring),
            "summer" => Some(Season::Summer),
            "autumn" | "fall" => Some(Season::Autumn),
            "winter" => Some(Season::Winter),
            _ => None,
        }
    }

    /// Meteorological seasons, northern hemisphere.
    fn months(self) -> [Month; 3] {
        match self {
            Season::Spring => [Month::March, Month::April, Month::May],
            Season::Summer => [Month::June, Month::July, Month::August],
            Season::Autumn => [Month::September, Month::October, Month::November],
            Season::Winter => [Month::December, Month::January, Month::February],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastPeriod {
    Day(NaiveDate),
    Month { month: Month, year: Option<i32> },
    Months { months: Vec<Month>, year: Option<i32> },
    Season { season: Season, year: Option<i32> },
    Quarter { quarter: u8, year: Option<i32> },
    Year(i32),
}

impl ForecastPeriod {
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        if let Ok(day) = NaiveDate::parse_from_str(label, "%d/%m/%Y") {
            return Some(ForecastPeriod::Day(day));
        }
        if let Ok(year) = label.parse::<i32>() {
            return plausible_year(year).map(ForecastPeriod::Year);
        }

        // Split a trailing year off: "autumn 2025" → ("autumn", Some(2025)).
        let (head, year) = match label.rsplit_once(char::is_whitespace) {
            Some((head, tail)) => match tail.parse::<i32>().ok().and_then(plausible_year) {
                Some(year) => (head.trim(), Some(year)),
                None => (label, None),
            },
            None => (label, None),
        };

        if let Some(quarter) = parse_quarter(head) {
            return Some(ForecastPeriod::Quarter { quarter, year });
        }
        if let Some(season) = Season::parse(head) {
            return Some(ForecastPeriod::Season { season, year });
        }

        let months: Option<Vec<Month>> = head
            .split(',')
            .map(|m| m.trim().parse::<Month>().ok())
            .collect();
        match months {
            Some(months) if months.len() == 1 => Some(ForecastPeriod::Month {
                month: months[0],
                year,
            }),
            Some(months) if !months.is_empty() => Some(ForecastPeriod::Months { months, year }),
            _ => None,
        }
    }

    /// Plain-language statement of what the period covers.
    pub fn coverage(&self) -> String {
        match self {
            ForecastPeriod::Day(day) => format!("the single day {}", day.format("%d/%m/%Y")),
            ForecastPeriod::Month { month, year } => with_year(month.name().to_string(), *year),
            ForecastPeriod::Months { months, year } => with_year(list_months(months), *year),
            ForecastPeriod::Season { season, year } => {
                with_year(list_months(&season.months()), *year)
            }
            ForecastPeriod::Quarter { quarter, year } => {
                let first = (*quarter - 1) * 3 + 1;
                let months: Vec<Month> = (first..first + 3)
                    .filter_map(|m| Month::try_from(m).ok())
                    .collect();
                with_year(list_months(&months), *year)
            }
            ForecastPeriod::Year(year) => format!("the whole of {year}, January to December"),
        }
    }
}

fn plausible_year(year: i32) -> Option<i32> {
    (1900..=2200).contains(&year).then_some(year)
}

fn parse_quarter(word: &str) -> Option<u8> {
    let digits = word.strip_prefix('Q').or_else(|| word.strip_prefix('q'))?;
    let quarter: u8 = digits.parse().ok()?;
    (1..=4).contains(&quarter).then_some(quarter)
}

fn list_months(months: &[Month]) -> String {
    let names: Vec<&str> = months.iter().map(|m| m.name()).collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

fn with_year(text: String, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{text} {year}"),
        None => text,
    }
}
