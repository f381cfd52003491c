// Forecast instruction templates and the prompt builder.
// Templates are filled in one pass over their `{placeholder}` tokens, so text
// inserted from the request is never scanned for placeholders again.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::forecast::dates::{display_date, display_day_month};
use crate::forecast::models::{ForecastInput, ForecastTarget};
use crate::forecast::periods::ForecastPeriod;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern"));

/// Used when the request carries no forecast period label.
pub const GENERIC_PERIOD: &str = "the upcoming period";

/// Single birth date template.
/// Replace: {language}, {target_date}, {period}, {period_scope}
pub const SINGLE_PROMPT_TEMPLATE: &str = r####"You are an experienced numerologist and spiritual guide. Generate a personalized, engaging numerology forecast in {language}.
Target date: {target_date}.
Forecast period: {period}.{period_scope}

Instructions for the forecast:
1. Start with a warm and engaging introduction that makes the reader feel personally addressed and intrigued.
2. Clearly calculate and explain the core numerology numbers relevant to the period (such as Life Path Number, Personal Year Number, Personal Month Number, or Day Number).
3. Interpret each number in detail, using an inspiring, uplifting, and trustworthy tone. Avoid sounding too generic — the forecast should feel unique and tailored.
4. Cover different life areas:
   - Career & Finances
   - Relationships & Family
   - Personal Growth & Spirituality
   - Health & Well-being
5. Give practical advice and gentle warnings where necessary (e.g., "This is a month to be cautious with spending" or "New partnerships may appear, pay attention to…").
6. End with a motivating conclusion under a "## Conclusion" heading that summarizes the main theme of the forecast and leaves the reader with a sense of clarity and encouragement.

Style:
- Write in a captivating, narrative style as if telling the story of the person's upcoming path.
- Keep the tone positive, wise, and engaging — a balance of mystical insight and practical guidance.
- Make the forecast about 500–700 words to provide depth and richness.

Now, based on the given date of birth and forecast period, generate the full numerology forecast."####;

/// Group born between two full dates. Also used for batch-derived ranges.
/// Replace: {language}, {start}, {end}, {period}, {period_scope}
pub const RANGE_PROMPT_TEMPLATE: &str = r####"You are an experienced numerologist and spiritual guide. Generate detailed, engaging numerology forecasts in {language} for a large group of people born within the date range [Start {start}] to [End {end}].
Forecast period: {period}.{period_scope}
Instructions:
1. Divide the group by Life Path Numbers (1–9) and generate a forecast for each Life Path under a heading of the form "### Life Path N: Title".
2. For each Life Path forecast, provide insights for the following areas:
   - Career & Finances
   - Relationships & Family
   - Personal Growth & Spirituality
   - Health & Well-being
3. Optionally, enhance personalization by mentioning month of birth or season.
4. Use a captivating, positive, and trustworthy style. Make each forecast feel unique and inspiring.
5. Each forecast should be around 400–600 words.

Now, generate forecasts for all Life Path Numbers within the specified date range."####;

/// Group horoscope for a day/month span with no birth year.
/// Replace: {language}, {start}, {end}, {period}, {period_scope}
pub const DAY_MONTH_PROMPT_TEMPLATE: &str = r####"You are an experienced numerologist and spiritual guide. Generate detailed, engaging numerology forecasts in {language} for everyone whose birthday falls between {start} and {end} (day/month, any birth year).
Forecast period: {period}.{period_scope}
Instructions:
1. Because birth years differ, divide the group by Life Path Numbers (1–9) and write a forecast for each Life Path under a heading of the form "### Life Path N: Title".
2. For each Life Path forecast, provide insights for the following areas:
   - Career & Finances
   - Relationships & Family
   - Personal Growth & Spirituality
   - Health & Well-being
3. Weave in the shared energy of the birthday span itself (the days and month it covers).
4. Use a captivating, positive, and trustworthy style. Make each forecast feel unique and inspiring.
5. Each forecast should be around 300–500 words.

Now, generate forecasts for all Life Path Numbers for the specified birthday span."####;

/// Builds the instruction text for one forecast. Pure function of the input.
pub fn build_prompt(input: &ForecastInput) -> String {
    let period = input.forecast_period().unwrap_or(GENERIC_PERIOD);
    let period_scope = input
        .forecast_period()
        .and_then(ForecastPeriod::parse)
        .map(|p| format!("\nThe forecast period covers {}.", p.coverage()))
        .unwrap_or_default();

    let (template, start, end) = match &input.target {
        ForecastTarget::Single { date } => {
            (SINGLE_PROMPT_TEMPLATE, display_date(date), String::new())
        }
        ForecastTarget::Range { start, end } => {
            (RANGE_PROMPT_TEMPLATE, display_date(start), display_date(end))
        }
        ForecastTarget::DateRange { start, end } => (
            DAY_MONTH_PROMPT_TEMPLATE,
            display_day_month(start),
            display_day_month(end),
        ),
    };

    fill(template, |name| match name {
        "language" => Some(input.language()),
        "target_date" | "start" => Some(start.as_str()),
        "end" => Some(end.as_str()),
        "period" => Some(period),
        "period_scope" => Some(period_scope.as_str()),
        _ => None,
    })
}

/// Replaces each `{name}` token with `lookup(name)`; unknown tokens are kept.
fn fill<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match lookup(&caps[1]) {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(caps[0].to_string()),
        })
        .into_owned()
}
