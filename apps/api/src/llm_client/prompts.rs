// Shared prompt constants for the generation client.
// Forecast instruction templates live in forecast/prompts.rs alongside the builder.

/// System prompt sent with every forecast generation call.
pub const FORECAST_SYSTEM: &str = "You write detailed, structured numerology forecasts. \
    Use markdown headings of the form '### Life Path N: Title' for each Life Path section, \
    bold sub-headings for life areas, and plain paragraphs for prose. \
    Do NOT wrap the answer in code fences.";

/// Canned forecast returned by the offline generator (`USE_LLM=false`).
pub const OFFLINE_FORECAST: &str = r#"
# Numerology Forecast

Welcome to a focused interpretation based on your date parameters.
This offline reading is produced without contacting a language model.

---

### Life Path 1: The Pioneer
**Career & Finances:**
Windows of action open early in the period. Start the project you have been postponing.
**Relationships & Family:**
Lead with warmth rather than certainty.

### Life Path 2: The Diplomat
**Personal Growth & Spirituality:**
Quiet reflection pays off; keep a short journal.
**Health & Well-being:**
Favour steady routines over bursts of effort.

## Conclusion
Use this forecast as guidance, but remember your free will.
"#;
