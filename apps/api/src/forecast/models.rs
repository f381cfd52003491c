use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::forecast::dates::{display_date, display_day_month, file_date, parse_iso};

pub const DEFAULT_LANGUAGE: &str = "English";
pub const FORECAST_TITLE: &str = "Numerology Forecast";

/// The dates a forecast is written for, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ForecastTarget {
    /// One birth date, ISO `YYYY-MM-DD`.
    Single { date: String },
    /// A group born between two ISO dates. Batch items use this variant too.
    Range { start: String, end: String },
    /// A dateless day/month span (`MM-DD`), used for group horoscopes.
    DateRange { start: String, end: String },
}

/// Visual theme of the rendered document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Classic,
    Modern,
}

/// Request body for a single forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInput {
    #[serde(flatten)]
    pub target: ForecastTarget,
    #[serde(default)]
    pub forecast_period: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default, alias = "uploadToDrive")]
    pub upload: bool,
}

impl ForecastInput {
    #[cfg(test)]
    pub fn single(date: impl Into<String>) -> Self {
        Self::with_target(ForecastTarget::Single { date: date.into() })
    }

    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::with_target(ForecastTarget::Range {
            start: start.into(),
            end: end.into(),
        })
    }

    fn with_target(target: ForecastTarget) -> Self {
        Self {
            target,
            forecast_period: None,
            language: None,
            theme: None,
            upload: false,
        }
    }

    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn theme(&self) -> Theme {
        self.theme.unwrap_or_default()
    }

    pub fn forecast_period(&self) -> Option<&str> {
        self.forecast_period
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Rejects inputs whose required date fields are blank, and puts a reversed
    /// ISO range back in order. Day/month spans are left alone because they may
    /// legitimately wrap the new year (22/12 to 19/01).
    pub fn normalized(mut self) -> Result<Self, String> {
        match &mut self.target {
            ForecastTarget::Single { date } => {
                if date.trim().is_empty() {
                    return Err("date is required for a single forecast".to_string());
                }
            }
            ForecastTarget::Range { start, end } => {
                if start.trim().is_empty() || end.trim().is_empty() {
                    return Err("start and end are required for a range forecast".to_string());
                }
                if let (Some(s), Some(e)) = (parse_iso(start), parse_iso(end)) {
                    if s > e {
                        std::mem::swap(start, end);
                    }
                }
            }
            ForecastTarget::DateRange { start, end } => {
                if start.trim().is_empty() || end.trim().is_empty() {
                    return Err("start and end are required for a dateRange forecast".to_string());
                }
            }
        }
        Ok(self)
    }

    /// Human label of the dates, shown on the cover page.
    pub fn date_label(&self) -> String {
        match &self.target {
            ForecastTarget::Single { date } => display_date(date),
            ForecastTarget::Range { start, end } => {
                format!("{} — {}", display_date(start), display_date(end))
            }
            ForecastTarget::DateRange { start, end } => {
                format!("{} — {}", display_day_month(start), display_day_month(end))
            }
        }
    }

    /// Display name for the downloadable / uploaded file.
    pub fn file_name(&self) -> String {
        match &self.target {
            ForecastTarget::Single { date } => format!("{FORECAST_TITLE}_{}.pdf", date.trim()),
            ForecastTarget::Range { start, end } => {
                format!("{FORECAST_TITLE}_{}_to_{}.pdf", file_date(start), file_date(end))
            }
            ForecastTarget::DateRange { start, end } => format!(
                "{FORECAST_TITLE}_{}_to_{}.pdf",
                display_day_month(start).replace('/', "-"),
                display_day_month(end).replace('/', "-")
            ),
        }
    }
}

/// One titled block of forecast prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub content: String,
}

/// Response of a single forecast run. Never mutated after it is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub sections: Vec<Section>,
    pub pdf_url: String,
    pub file_name: String,
    #[serde(default, alias = "driveFileId", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_input_deserializes_with_defaults() {
        let json = r#"{"type": "single", "date": "2025-09-14", "language": "English"}"#;
        let input: ForecastInput = serde_json::from_str(json).unwrap();
        assert_eq!(
            input.target,
            ForecastTarget::Single {
                date: "2025-09-14".to_string()
            }
        );
        assert_eq!(input.language(), "English");
        assert_eq!(input.theme(), Theme::Classic);
        assert!(!input.upload);
    }

    #[test]
    fn test_date_range_input_accepts_legacy_upload_flag() {
        let json = r#"{
            "type": "dateRange",
            "start": "03-21",
            "end": "04-19",
            "forecastPeriod": "Q2 2025",
            "theme": "modern",
            "uploadToDrive": true
        }"#;
        let input: ForecastInput = serde_json::from_str(json).unwrap();
        assert!(matches!(input.target, ForecastTarget::DateRange { .. }));
        assert_eq!(input.forecast_period(), Some("Q2 2025"));
        assert_eq!(input.theme(), Theme::Modern);
        assert!(input.upload);
    }

    #[test]
    fn test_range_without_end_fails_deserialization() {
        let json = r#"{"type": "range", "start": "1980-01-01"}"#;
        let result: Result<ForecastInput, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let input = ForecastInput::range("1982-12-31", "1980-01-01")
            .normalized()
            .unwrap();
        assert_eq!(
            input.target,
            ForecastTarget::Range {
                start: "1980-01-01".to_string(),
                end: "1982-12-31".to_string()
            }
        );
    }

    #[test]
    fn test_wrapping_day_month_range_is_kept() {
        let mut input = ForecastInput::range("x", "y");
        input.target = ForecastTarget::DateRange {
            start: "12-22".to_string(),
            end: "01-19".to_string(),
        };
        let input = input.normalized().unwrap();
        assert_eq!(input.date_label(), "22/12 — 19/01");
    }

    #[test]
    fn test_unrecognized_day_month_passes_through() {
        let input: ForecastInput = serde_json::from_str(
            r#"{"type": "dateRange", "start": "21.03", "end": "19.04"}"#,
        )
        .unwrap();
        let input = input.normalized().unwrap();
        assert_eq!(input.date_label(), "21.03 — 19.04");
        assert!(crate::forecast::prompts::build_prompt(&input).contains("between 21.03 and 19.04"));
    }

    #[test]
    fn test_blank_day_month_is_rejected() {
        let mut input = ForecastInput::single("unused");
        input.target = ForecastTarget::DateRange {
            start: "03-21".to_string(),
            end: " ".to_string(),
        };
        assert!(input.normalized().is_err());
    }

    #[test]
    fn test_blank_single_date_is_rejected() {
        assert!(ForecastInput::single("  ").normalized().is_err());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            ForecastInput::single("2025-09-14").file_name(),
            "Numerology Forecast_2025-09-14.pdf"
        );
        assert_eq!(
            ForecastInput::range("1980-01-01", "1980-01-15").file_name(),
            "Numerology Forecast_01-01-1980_to_15-01-1980.pdf"
        );
    }

    #[test]
    fn test_result_omits_missing_remote_id() {
        let result = ForecastResult {
            id: Uuid::new_v4(),
            title: FORECAST_TITLE.to_string(),
            summary: "s".to_string(),
            sections: vec![],
            pdf_url: "http://localhost/static/x.pdf".to_string(),
            file_name: "x.pdf".to_string(),
            remote_id: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("remoteId").is_none());
        assert!(value.get("pdfUrl").is_some());
    }
}
