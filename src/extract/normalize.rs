//! Cleanup applied to every page before concatenation.

use unicode_normalization::UnicodeNormalization;

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Normalize raw page text.
///
/// NFC, ligatures expanded, Private Use Area and U+FFFD dropped, line endings
/// unified and trailing spaces removed. Form feeds become newlines so a page
/// can never contain the page marker itself.
pub fn normalize_page_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.nfc() {
        if let Some((_, expanded)) = LIGATURES.iter().find(|(l, _)| *l == c) {
            out.push_str(expanded);
        } else if c == '\u{000C}' {
            out.push('\n');
        } else if !is_pua(c) && c != '\u{FFFD}' && c != '\r' {
            out.push(c);
        }
    }

    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_pua(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ligatures() {
        assert_eq!(normalize_page_text("\u{FB01}ammable"), "fiammable");
        assert_eq!(normalize_page_text("e\u{FB03}cient"), "efficient");
    }

    #[test]
    fn test_nfc() {
        assert_eq!(normalize_page_text("e\u{0301}"), "\u{00E9}");
    }

    #[test]
    fn test_removes_pua_and_replacement() {
        assert_eq!(normalize_page_text("UN\u{E000}1090\u{FFFD}"), "UN1090");
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(normalize_page_text("a  \r\nb\t\r\n"), "a\nb");
        assert_eq!(normalize_page_text("a\u{c}b"), "a\nb");
    }
}
