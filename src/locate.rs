//! Section location by heading match.
//!
//! The section starts at an occurrence of the configured title and runs to
//! the next heading at the same or a shallower depth, or to the end of the
//! text. Headings come in two shapes:
//!
//! - keyword form: `SECTION 15: Regulatory information`
//! - bare numbered form: `15. Regulatory information` (upper-case first letter)
//!
//! When the title occurs more than once (a table of contents followed by
//! the body), the [`SectionOccurrence`] policy decides which one is used.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{SectionOccurrence, Settings};
use crate::error::{Error, Result};
use crate::model::SectionSpan;

/// Ties closer than this are broken towards the later occurrence.
const SCORE_EPSILON: f64 = 1e-9;

/// Added to the score of an occurrence that does not open its line.
const INLINE_PENALTY: f64 = 1.0;

fn keyword_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*section[^\S\n]*(\d+(?:\.\d+)*)\b").expect("valid heading regex")
    })
}

fn numbered_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)*)[.:)]?[^\S\n]+\p{Lu}").expect("valid heading regex")
    })
}

fn section_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid number regex"))
}

/// Finds the configured section in a document text.
#[derive(Debug, Clone)]
pub struct SectionLocator {
    title: String,
    pattern: Regex,
    number: Option<Vec<u32>>,
    occurrence: SectionOccurrence,
}

impl SectionLocator {
    /// Create a locator for `title`.
    pub fn new(title: &str, occurrence: SectionOccurrence) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Config("section title is empty".into()));
        }

        Ok(Self {
            title: title.to_string(),
            pattern: title_pattern(title)?,
            number: section_number()
                .find(title)
                .and_then(|m| parse_number(m.as_str())),
            occurrence,
        })
    }

    /// Create a locator from `general.section_title` and `general.section_occurrence`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.general.section_title,
            settings.general.section_occurrence,
        )
    }

    /// Title this locator searches for.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Byte offsets of every case-insensitive occurrence of the title.
    pub fn occurrences(&self, text: &str) -> Vec<usize> {
        self.pattern.find_iter(text).map(|m| m.start()).collect()
    }

    /// Locate the section in `text`.
    pub fn locate(&self, text: &str) -> Result<SectionSpan> {
        let matches: Vec<(usize, usize)> = self
            .pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();

        let Some(&(start, title_end)) = self.choose(text, &matches) else {
            return Err(Error::SectionNotFound(self.title.clone()));
        };

        let end = self.section_end(text, title_end);
        log::debug!(
            "Located '{}' at {}..{} ({} occurrence(s))",
            self.title,
            start,
            end,
            matches.len()
        );
        Ok(SectionSpan::from_range(text, start, end))
    }

    fn choose<'a>(&self, text: &str, matches: &'a [(usize, usize)]) -> Option<&'a (usize, usize)> {
        match self.occurrence {
            SectionOccurrence::First => matches.first(),
            SectionOccurrence::Last => matches.last(),
            SectionOccurrence::Auto => {
                let mut best: Option<(&(usize, usize), f64)> = None;
                for m in matches {
                    let score = heading_score(text, m.0, m.1);
                    log::trace!("Occurrence at {} scores {:.3}", m.0, score);
                    match best {
                        Some((_, best_score)) if score > best_score + SCORE_EPSILON => {}
                        _ => best = Some((m, score)),
                    }
                }
                best.map(|(m, _)| m)
            }
        }
    }

    /// Start of the first sibling heading after the title line, or the end of text.
    fn section_end(&self, text: &str, title_end: usize) -> usize {
        let Some(newline) = text[title_end..].find('\n') else {
            return text.len();
        };

        let mut offset = title_end + newline + 1;
        for line in text[offset..].split_inclusive('\n') {
            if self.ends_section(line) {
                return offset;
            }
            offset += line.len();
        }
        text.len()
    }

    fn ends_section(&self, line: &str) -> bool {
        let (number, keyword) = if let Some(caps) = keyword_heading().captures(line) {
            (parse_number(&caps[1]), true)
        } else if let Some(caps) = numbered_heading().captures(line) {
            (parse_number(&caps[1]), false)
        } else {
            return false;
        };

        let Some(title) = &self.number else {
            // unnumbered titles end at the next keyword heading of any kind
            return keyword;
        };
        let Some(number) = number else {
            return false;
        };

        if number.len() > title.len() || number.starts_with(title) {
            return false;
        }
        // numeric table rows look like bare headings; only a later section counts
        keyword || number[0] > title[0]
    }
}

/// Locate `title` in `text` with the default occurrence policy.
pub fn locate_section(text: &str, title: &str) -> Result<SectionSpan> {
    SectionLocator::new(title, SectionOccurrence::default())?.locate(text)
}

/// Case-insensitive title regex tolerant to whitespace differences.
fn title_pattern(title: &str) -> Result<Regex> {
    let body = title
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[^\S\n]+");

    let starts_word = title.chars().next().is_some_and(is_word_char);
    let ends_word = title.chars().last().is_some_and(is_word_char);

    let pattern = format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    );
    Ok(Regex::new(&pattern)?)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn parse_number(s: &str) -> Option<Vec<u32>> {
    s.split('.').map(|p| p.parse().ok()).collect()
}

/// Lower is more heading-like.
///
/// Digits and punctuation around the title (dot leaders, page numbers)
/// mark a table-of-contents entry or a cross-reference.
fn heading_score(text: &str, start: usize, end: usize) -> f64 {
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[end..].find('\n').map(|i| end + i).unwrap_or(text.len());

    let before = &text[line_start..start];
    let after = &text[end..line_end];

    let mut significant = 0usize;
    let mut noisy = 0usize;
    for c in before.chars().chain(after.chars()) {
        if c.is_whitespace() {
            continue;
        }
        significant += 1;
        if c.is_ascii_digit() || c.is_ascii_punctuation() {
            noisy += 1;
        }
    }

    let density = if significant == 0 {
        0.0
    } else {
        noisy as f64 / significant as f64
    };

    if before.trim().is_empty() {
        density
    } else {
        density + INLINE_PENALTY
    }
}
