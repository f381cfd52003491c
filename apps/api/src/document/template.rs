//! Document Assembler: turns a parsed forecast into paginated HTML for the renderer.
//!
//! Page order: cover, introduction (if any), one or more pages per section,
//! conclusion. Sections whose body renders to nothing are skipped.

use std::sync::LazyLock;

use regex::Regex;

use crate::forecast::models::{Theme, FORECAST_TITLE};
use crate::forecast::parser::{plain_text, LifePathDialect, LineClassifier, LineKind, ParsedForecast};

pub const DEFAULT_CONCLUSION: &str = "Use this forecast as guidance, but remember your free will.";

static INLINE_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("inline bold pattern"));

/// Page-level layout knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Rendered paragraphs/sub-headings per physical page before a section
    /// continues on the next page. 0 keeps each section on one page.
    pub paragraphs_per_page: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            paragraphs_per_page: 14,
        }
    }
}

/// What the cover page says.
#[derive(Debug, Clone)]
pub struct CoverInfo<'a> {
    pub date_label: &'a str,
    pub period_label: Option<&'a str>,
    pub theme: Theme,
}

pub fn assemble_document(
    parsed: &ParsedForecast,
    cover: &CoverInfo<'_>,
    options: &LayoutOptions,
) -> String {
    let classifier = LifePathDialect;
    let mut pages: Vec<String> = vec![cover_page(cover)];

    if !parsed.intro.is_empty() {
        let body = render_lines(&classifier, &parsed.intro);
        pages.extend(paginate("Introduction", &body, options));
    }

    for section in &parsed.sections {
        let lines: Vec<String> = section.content.lines().map(str::to_string).collect();
        let body = render_lines(&classifier, &lines);
        if body.is_empty() {
            continue;
        }
        pages.extend(paginate(&section.heading, &body, options));
    }

    let conclusion = if parsed.conclusion.is_empty() {
        vec![format!("<p>{}</p>", escape_html(DEFAULT_CONCLUSION))]
    } else {
        render_lines(&classifier, &parsed.conclusion)
    };
    pages.extend(paginate("Conclusion", &conclusion, options));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<link href="https://fonts.googleapis.com/css2?family=Roboto+Slab:wght@400;700&family=Inter:wght@400;600&display=swap&subset=cyrillic" rel="stylesheet">
<style>
{css}
</style>
</head>
<body>
{pages}
</body>
</html>
"#,
        title = FORECAST_TITLE,
        css = theme_css(cover.theme),
        pages = pages.join("\n"),
    )
}

fn cover_page(cover: &CoverInfo<'_>) -> String {
    let subtitle = match cover.period_label {
        Some(period) => format!("Forecast period: {}", escape_html(period)),
        None => "Personalized prediction".to_string(),
    };
    format!(
        r#"<div class="page cover">
  <div>
    <h1>{title}</h1>
    <h2>for {date}</h2>
    <p class="subtitle">{subtitle}</p>
  </div>
</div>"#,
        title = FORECAST_TITLE,
        date = escape_html(cover.date_label),
    )
}

/// Renders body lines to HTML elements. Bold-wrapped lines become sub-headings.
fn render_lines(classifier: &dyn LineClassifier, lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| {
            let trimmed = line.trim();
            match classifier.classify(trimmed) {
                LineKind::Blank | LineKind::RuleBreak | LineKind::DocumentTitle => None,
                LineKind::SubHeading(title) => Some(format!("<h3>{}</h3>", escape_html(&title))),
                LineKind::Heading { .. } | LineKind::Conclusion => {
                    Some(format!("<h3>{}</h3>", escape_html(&plain_text(trimmed))))
                }
                LineKind::Text(text) => Some(render_paragraph(&text)),
            }
        })
        .collect()
}

fn render_paragraph(text: &str) -> String {
    let bullet = text
        .strip_prefix("- ")
        .or_else(|| text.strip_prefix("* "))
        .or_else(|| text.strip_prefix("• "));
    match bullet {
        Some(item) => format!(r#"<p class="bullet">{}</p>"#, render_inline(item.trim())),
        None => format!("<p>{}</p>", render_inline(text)),
    }
}

fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    INLINE_BOLD
        .replace_all(&escaped, "<strong>$1</strong>")
        .into_owned()
}

/// Splits a section body across physical pages.
fn paginate(heading: &str, body: &[String], options: &LayoutOptions) -> Vec<String> {
    let per_page = match options.paragraphs_per_page {
        0 => body.len().max(1),
        n => n,
    };
    if body.is_empty() {
        return vec![page(heading, "")];
    }
    body.chunks(per_page)
        .enumerate()
        .map(|(i, chunk)| {
            let title = if i == 0 {
                heading.to_string()
            } else {
                format!("{heading} (continued)")
            };
            page(&title, &chunk.join("\n    "))
        })
        .collect()
}

fn page(heading: &str, content: &str) -> String {
    format!(
        r#"<div class="page">
    <h2>{}</h2>
    {}
</div>"#,
        escape_html(heading),
        content
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn theme_css(theme: Theme) -> String {
    let (font, ink, cover_bg, accent) = match theme {
        Theme::Classic => (
            "'Roboto Slab', serif",
            "#333",
            "linear-gradient(135deg, #1a1a40, #4b0082)",
            "#4b0082",
        ),
        Theme::Modern => (
            "'Inter', sans-serif",
            "#1f2933",
            "linear-gradient(135deg, #0f2027, #2c5364)",
            "#2c5364",
        ),
    };
    format!(
        r#"  @page {{ size: A4; margin: 0; }}
  body {{ margin:0; padding:0; font-family:{font}; line-height:1.5; color:{ink}; }}
  .page {{ width:100%; min-height:100%; padding:60px; box-sizing:border-box; page-break-after: always; }}
  .cover {{ background: {cover_bg}; color: white; display:flex; justify-content:center; align-items:center; text-align:center; min-height:297mm; }}
  .cover h1 {{ font-size:48px; margin-bottom:20px; }}
  .cover h2 {{ font-size:28px; margin-bottom:10px; color:white; }}
  .cover .subtitle {{ font-size:18px; opacity:0.8; }}
  h2 {{ font-size:24px; margin-bottom:15px; color:{accent}; }}
  h3 {{ font-size:20px; margin-bottom:10px; font-weight:bold; }}
  p {{ font-size:16px; margin-bottom:12px; }}
  p.bullet {{ padding-left:18px; text-indent:-12px; }}
  p.bullet::before {{ content:"• "; }}"#
    )
}
