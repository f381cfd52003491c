use serde::{Deserialize, Serialize};

use crate::batch::expand::DateSpan;
use crate::forecast::dates::to_iso;
use crate::forecast::models::{ForecastInput, ForecastResult, Theme};

/// Request body for a batch run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchForecastInput {
    /// `"1980"` or `"1980-1982"`.
    pub birth_year: String,
    #[serde(default)]
    pub split_month: bool,
    #[serde(default)]
    pub target_period: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default, alias = "uploadToDrive")]
    pub upload: bool,
    /// Lets a client open the progress stream before posting the batch.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl BatchForecastInput {
    /// The single-forecast input for one expanded span.
    pub fn item_input(&self, span: &DateSpan) -> ForecastInput {
        let mut input = ForecastInput::range(to_iso(span.start), to_iso(span.end));
        input.forecast_period = self.target_period.clone();
        input.language = self.language.clone();
        input.theme = self.theme;
        input.upload = self.upload;
        input
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchForecastResult {
    pub session_id: String,
    pub total_generated: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ForecastResult>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::models::ForecastTarget;
    use chrono::NaiveDate;

    #[test]
    fn test_batch_input_accepts_front_end_shape() {
        let json = r#"{
            "type": "batch",
            "birthYear": "1980-1982",
            "splitMonth": true,
            "targetPeriod": "Q1 2025",
            "theme": "modern",
            "uploadToDrive": true
        }"#;
        let input: BatchForecastInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.birth_year, "1980-1982");
        assert!(input.split_month);
        assert!(input.upload);
        assert!(input.session_id.is_none());
    }

    #[test]
    fn test_item_input_carries_shared_options() {
        let input: BatchForecastInput = serde_json::from_str(
            r#"{"birthYear": "1980", "targetPeriod": "autumn 2025", "language": "Russian"}"#,
        )
        .unwrap();
        let span = DateSpan {
            start: NaiveDate::from_ymd_opt(1980, 2, 16).unwrap(),
            end: NaiveDate::from_ymd_opt(1980, 2, 29).unwrap(),
        };
        let item = input.item_input(&span);
        assert_eq!(
            item.target,
            ForecastTarget::Range {
                start: "1980-02-16".to_string(),
                end: "1980-02-29".to_string()
            }
        );
        assert_eq!(item.forecast_period(), Some("autumn 2025"));
        assert_eq!(item.language(), "Russian");
        assert!(!item.upload);
    }
}
