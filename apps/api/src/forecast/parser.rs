//! Forecast Parser: splits free-form generator prose into introduction,
//! ordered Life Path sections, and conclusion.
//!
//! Line recognition lives behind [`LineClassifier`]; the parser loop only reacts
//! to [`LineKind`] values. A new heading dialect is a new classifier, not a new
//! branch in `parse_with`.
//!
//! The parser never fails. Output that follows no known convention degrades to a
//! single catch-all section.

use std::sync::LazyLock;

use regex::Regex;

use crate::forecast::models::Section;

/// Maximum summary length, in characters.
pub const SUMMARY_MAX_CHARS: usize = 400;
pub const SUMMARY_FALLBACK: &str = "Personal numerology reading.";
pub const FALLBACK_SECTION_HEADING: &str = "Your Numerology Forecast";

static RULE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3,}|_{3,}|\*{3,})$").expect("rule pattern"));
static LIFE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^life\s+path\s*(?:number\s*)?#?\s*(\d{1,2})\b\s*(?:[:.\-–—]\s*(.*))?$")
        .expect("life path pattern")
});
static CONCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:in\s+conclusion|conclusion|final\s+thoughts|closing\s+thoughts)\b")
        .expect("conclusion pattern")
});
static DOCUMENT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^numerology\s+forecasts?\b").expect("document title pattern")
});
static BOLD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*(.+?)\*\*:?$").expect("bold line pattern"));

// ────────────────────────────────────────────────────────────────────────────
// Line classification
// ────────────────────────────────────────────────────────────────────────────

/// What a single (trimmed) line of generator output means structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// `---`, `___`, `***`
    RuleBreak,
    /// The document's own "Numerology Forecast" title.
    DocumentTitle,
    /// Opens a new Life Path section.
    Heading { number: u32, title: Option<String> },
    /// Opens the closing remarks. Only `#` headings qualify.
    Conclusion,
    /// A minor heading inside a section (bold-wrapped line or markdown heading).
    SubHeading(String),
    Text(String),
}

/// Strategy for recognizing heading dialects in generator output.
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> LineKind;
}

/// How a line announced itself as a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// `#`-prefixed, with the count of `#`.
    Hashes(usize),
    /// The whole line is `**…**`, optionally followed by `:`.
    BoldLine,
    /// Starts with `**` but the bold run ends mid-line (`**Life Path 3:** The Leader`).
    BoldLead,
}

/// The default dialect: "### Life Path 3: Title", "#### Life Path Number 3",
/// "**Life Path 3**", "**Life Path 3:** Title".
#[derive(Debug, Clone, Copy, Default)]
pub struct LifePathDialect;

impl LineClassifier for LifePathDialect {
    fn classify(&self, line: &str) -> LineKind {
        let line = line.trim();
        if line.is_empty() {
            return LineKind::Blank;
        }
        if RULE_LINE.is_match(line) {
            return LineKind::RuleBreak;
        }

        let Some((marker, inner)) = split_marker(line) else {
            return LineKind::Text(line.to_string());
        };

        if let Some(caps) = LIFE_PATH.captures(&inner) {
            let level_ok = match marker {
                Marker::Hashes(n) => (2..=5).contains(&n),
                Marker::BoldLine | Marker::BoldLead => true,
            };
            if let (true, Ok(number)) = (level_ok, caps[1].parse::<u32>()) {
                let title = caps
                    .get(2)
                    .map(|m| clean_title(m.as_str()))
                    .filter(|t| !t.is_empty());
                return LineKind::Heading { number, title };
            }
        }

        if marker == Marker::BoldLead {
            // Bold lead-in on a prose line ("**Career:** expect change").
            return LineKind::Text(line.to_string());
        }
        if DOCUMENT_TITLE.is_match(&inner) {
            return LineKind::DocumentTitle;
        }
        // Only a markdown heading no deeper than a Life Path heading closes the
        // sections; bold lines inside a section stay sub-headings.
        if matches!(marker, Marker::Hashes(n) if n <= 5) && CONCLUSION.is_match(&inner) {
            return LineKind::Conclusion;
        }
        LineKind::SubHeading(clean_title(&inner))
    }
}

fn split_marker(line: &str) -> Option<(Marker, String)> {
    if line.starts_with('#') {
        let hashes = line.chars().take_while(|&c| c == '#').count();
        let inner = line[hashes..].replace("**", "");
        return Some((Marker::Hashes(hashes), inner.trim().to_string()));
    }
    if let Some(caps) = BOLD_LINE.captures(line) {
        return Some((Marker::BoldLine, caps[1].trim().to_string()));
    }
    if line.starts_with("**") {
        return Some((Marker::BoldLead, line.replace("**", "").trim().to_string()));
    }
    None
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// Strips markdown emphasis and heading markers for plain-text use (summaries).
pub fn plain_text(line: &str) -> String {
    line.trim_start_matches('#')
        .replace("**", "")
        .replace("__", "")
        .trim()
        .to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Structured view of one generator response. Owned by a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedForecast {
    pub intro: Vec<String>,
    pub sections: Vec<Section>,
    pub conclusion: Vec<String>,
    pub summary: String,
}

enum Cursor {
    Intro,
    Section { heading: String, lines: Vec<String> },
    Conclusion,
}

/// Parses with the default Life Path dialect.
pub fn parse_forecast(raw: &str) -> ParsedForecast {
    parse_with(&LifePathDialect, raw)
}

pub fn parse_with(classifier: &dyn LineClassifier, raw: &str) -> ParsedForecast {
    let mut intro: Vec<String> = Vec::new();
    let mut summary_lines: Vec<String> = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut conclusion: Vec<String> = Vec::new();
    let mut cleaned: Vec<String> = Vec::new();
    let mut cursor = Cursor::Intro;

    for line in raw.split(['\n', '\r']) {
        let line = line.trim();
        let kind = classifier.classify(line);
        if matches!(kind, LineKind::Blank | LineKind::RuleBreak) {
            continue;
        }
        cleaned.push(line.to_string());

        match kind {
            LineKind::Heading { number, title } => {
                close_section(&mut cursor, &mut sections);
                let heading = match title {
                    Some(title) => format!("Life Path {number}: {title}"),
                    None => format!("Life Path {number}"),
                };
                cursor = Cursor::Section {
                    heading,
                    lines: Vec::new(),
                };
            }
            LineKind::Conclusion => {
                close_section(&mut cursor, &mut sections);
                cursor = Cursor::Conclusion;
            }
            LineKind::DocumentTitle => {}
            LineKind::SubHeading(_) | LineKind::Text(_) => match &mut cursor {
                Cursor::Intro => {
                    if matches!(kind, LineKind::Text(_)) {
                        summary_lines.push(plain_text(line));
                    }
                    intro.push(line.to_string());
                }
                Cursor::Section { lines, .. } => lines.push(line.to_string()),
                Cursor::Conclusion => conclusion.push(line.to_string()),
            },
            LineKind::Blank | LineKind::RuleBreak => {}
        }
    }
    close_section(&mut cursor, &mut sections);

    let summary = build_summary(&summary_lines);

    if sections.is_empty() {
        // Generator ignored the heading convention: keep everything in one section.
        return ParsedForecast {
            intro: Vec::new(),
            sections: vec![Section {
                heading: FALLBACK_SECTION_HEADING.to_string(),
                content: cleaned.join("\n"),
            }],
            conclusion: Vec::new(),
            summary,
        };
    }

    ParsedForecast {
        intro,
        sections,
        conclusion,
        summary,
    }
}

fn close_section(cursor: &mut Cursor, sections: &mut Vec<Section>) {
    if let Cursor::Section { heading, lines } = std::mem::replace(cursor, Cursor::Intro) {
        sections.push(Section {
            heading,
            content: lines.join("\n"),
        });
    }
}

fn build_summary(intro_text: &[String]) -> String {
    let joined = intro_text
        .iter()
        .filter(|l| !l.is_empty())
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        return SUMMARY_FALLBACK.to_string();
    }
    joined.chars().take(SUMMARY_MAX_CHARS).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
