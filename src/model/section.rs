//! Located section.

use serde::{Deserialize, Serialize};

/// The target section inside an extracted text.
///
/// `start` and `end` are byte offsets into the text the section was located
/// in, and `text` is exactly that slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl SectionSpan {
    /// Build a span from a source text and a byte range.
    pub fn from_range(source: &str, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: source[start..end].to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// First line of the section (the heading).
    pub fn heading(&self) -> &str {
        self.text.lines().next().unwrap_or("").trim()
    }

    /// Lines after the heading.
    pub fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().skip(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_range() {
        let source = "intro\nSection 14 Transport\nUN 1993\n";
        let span = SectionSpan::from_range(source, 6, source.len());
        assert_eq!(span.text, "Section 14 Transport\nUN 1993\n");
        assert_eq!(span.len(), span.text.len());
        assert_eq!(span.heading(), "Section 14 Transport");
        assert_eq!(span.body_lines().collect::<Vec<_>>(), vec!["UN 1993"]);
    }

    #[test]
    fn test_empty_span() {
        let span = SectionSpan::from_range("abc", 1, 1);
        assert!(span.is_empty());
        assert_eq!(span.heading(), "");
    }
}
