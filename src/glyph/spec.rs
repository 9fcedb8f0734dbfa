//! Requested glyphs, escape decoding and code-point file names.

use serde::Deserialize;

use crate::error::{PackError, Result};

/// One requested character.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawGlyphSpec")]
pub struct GlyphSpec {
    /// The character as written, possibly an escape such as `\u00e9`.
    pub raw: String,
    /// Explicit file name; derived from the code point when absent.
    pub filename: Option<String>,
    /// Subdirectory the image is written to.
    pub group: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGlyphSpec {
    Char(String),
    Full {
        #[serde(alias = "letter")]
        char: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        group: Option<String>,
    },
}

impl From<RawGlyphSpec> for GlyphSpec {
    fn from(raw: RawGlyphSpec) -> Self {
        match raw {
            RawGlyphSpec::Char(raw) => GlyphSpec::new(raw),
            RawGlyphSpec::Full { char, filename, group } => Self {
                raw: char,
                filename,
                group,
            },
        }
    }
}

impl GlyphSpec {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            filename: None,
            group: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The decoded character.
    pub fn decode(&self) -> Result<char> {
        decode_char(&self.raw)
    }

    /// File name without suffix and extension.
    pub fn file_stem(&self, ch: char) -> Result<String> {
        match &self.filename {
            Some(name) => {
                check_component(name, &self.raw, "filename")?;
                Ok(name.clone())
            }
            None => Ok(safe_filename(ch)),
        }
    }

    /// Validated group directory, if any.
    pub fn group_dir(&self) -> Result<Option<&str>> {
        match self.group.as_deref() {
            None | Some("") => Ok(None),
            Some(group) => check_component(group, &self.raw, "group").map(|_| Some(group)),
        }
    }
}

/// `u` followed by the lowercase hex code point, at least four digits.
///
/// Injective over all chars and safe on every filesystem.
pub fn safe_filename(ch: char) -> String {
    format!("u{:04x}", ch as u32)
}

/// Split a letters string into specs, keeping escape sequences whole.
pub fn parse_letters(letters: &str) -> Vec<GlyphSpec> {
    let mut specs = Vec::new();
    let mut rest = letters;

    while let Some(ch) = rest.chars().next() {
        let len = if ch == '\\' { escape_len(rest) } else { ch.len_utf8() };
        specs.push(GlyphSpec::new(&rest[..len]));
        rest = &rest[len..];
    }

    specs
}

/// Byte length of the escape at the start of `s`, or 1 for a lone backslash.
fn escape_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let hex_run = |from: usize, max: usize| {
        bytes[from..]
            .iter()
            .take(max)
            .take_while(|b| b.is_ascii_hexdigit())
            .count()
    };

    match bytes.get(1) {
        Some(b'u') if bytes.get(2) == Some(&b'{') => match s.find('}') {
            Some(close) => close + 1,
            None => 1,
        },
        Some(b'u') if hex_run(2, 4) == 4 => {
            // a surrogate pair spelled as two escapes stays one glyph
            if is_high_surrogate(&s[2..6]) && s[6..].starts_with("\\u") && hex_run(8, 4) == 4 {
                12
            } else {
                6
            }
        }
        Some(b'U') if hex_run(2, 8) == 8 => 10,
        _ => 1,
    }
}

fn is_high_surrogate(hex: &str) -> bool {
    u32::from_str_radix(hex, 16).is_ok_and(|v| (0xD800..0xDC00).contains(&v))
}

/// Decode a single character, accepting `\uXXXX`, `\u{X..}`, `\UXXXXXXXX`
/// and UTF-16 surrogate pairs written as two `\uXXXX` escapes.
pub fn decode_char(raw: &str) -> Result<char> {
    let invalid = |message: &str| PackError::GlyphRender {
        glyph: raw.to_string(),
        message: message.to_string(),
    };

    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => return Ok(ch),
        (None, _) => return Err(invalid("empty glyph")),
        _ => {}
    }

    let code = if let Some(body) = raw.strip_prefix("\\u{").and_then(|r| r.strip_suffix('}')) {
        parse_hex(body, 1..=6)
    } else if let Some(body) = raw.strip_prefix("\\U") {
        parse_hex(body, 8..=8)
    } else if let Some(body) = raw.strip_prefix("\\u") {
        match body.len() {
            4 => parse_hex(body, 4..=4),
            10 if body.get(4..6) == Some("\\u") => {
                let high = body.get(..4).and_then(|h| parse_hex(h, 4..=4));
                let low = body.get(6..).and_then(|l| parse_hex(l, 4..=4));
                match (high, low) {
                    (Some(high @ 0xD800..=0xDBFF), Some(low @ 0xDC00..=0xDFFF)) => {
                        Some(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    } else {
        return Err(invalid("expected a single character or a \\u escape"));
    };

    code.and_then(char::from_u32)
        .ok_or_else(|| invalid("escape does not name a Unicode scalar value"))
}

fn parse_hex(digits: &str, len: std::ops::RangeInclusive<usize>) -> Option<u32> {
    if !len.contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// A file or directory name must be a single, portable path component.
fn check_component(name: &str, glyph: &str, what: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control());

    if bad {
        return Err(PackError::GlyphRender {
            glyph: glyph.to_string(),
            message: format!("{} '{}' is not a safe file name", what, name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_from_code_point() {
        assert_eq!(safe_filename('A'), "u0041");
        assert_eq!(safe_filename('a'), "u0061");
        assert_eq!(safe_filename('/'), "u002f");
        assert_eq!(safe_filename('é'), "u00e9");
        assert_eq!(safe_filename('😀'), "u1f600");
    }

    #[test]
    fn test_safe_filename_recovers_code_point() {
        for ch in ['A', '?', 'ß', '字', '😀'] {
            let name = safe_filename(ch);
            let code = u32::from_str_radix(&name[1..], 16).unwrap();
            assert_eq!(char::from_u32(code), Some(ch));
        }
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_char("A").unwrap(), 'A');
        assert_eq!(decode_char("\\u0041").unwrap(), 'A');
        assert_eq!(decode_char("\\u{1F600}").unwrap(), '😀');
        assert_eq!(decode_char("\\U0001F600").unwrap(), '😀');
        assert_eq!(decode_char("\\uD83D\\uDE00").unwrap(), '😀');
        assert_eq!(decode_char("\\").unwrap(), '\\');
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        for raw in ["", "AB", "\\u00", "\\uZZZZ", "\\uD800", "\\u{110000}", "\\u{}", "\\uaééxxxxx", "\\uD83Dé\\uDE0"] {
            assert!(
                matches!(decode_char(raw), Err(PackError::GlyphRender { .. })),
                "{:?} should not decode",
                raw
            );
        }
    }

    #[test]
    fn test_parse_letters_keeps_escapes_together() {
        let raws: Vec<_> = parse_letters("Ab\\u00e9\\u{1F600}\\")
            .into_iter()
            .map(|s| s.raw)
            .collect();
        assert_eq!(raws, vec!["A", "b", "\\u00e9", "\\u{1F600}", "\\"]);

        let pair: Vec<_> = parse_letters("\\uD83D\\uDE00x").into_iter().map(|s| s.raw).collect();
        assert_eq!(pair, vec!["\\uD83D\\uDE00", "x"]);
    }

    #[test]
    fn test_explicit_filename_and_group() {
        let spec = GlyphSpec::new("A").with_filename("upper_a").in_group("latin");
        assert_eq!(spec.file_stem('A').unwrap(), "upper_a");
        assert_eq!(spec.group_dir().unwrap(), Some("latin"));

        assert!(GlyphSpec::new("A").with_filename("../x").file_stem('A').is_err());
        assert!(GlyphSpec::new("A").in_group("a/b").group_dir().is_err());
        assert_eq!(GlyphSpec::new("A").file_stem('A').unwrap(), "u0041");
    }

    #[test]
    fn test_deserialize_specs() {
        let specs: Vec<GlyphSpec> = serde_json::from_str(
            r#"["A", {"char": "a", "filename": "lower_a"}, {"letter": "\\u00e9", "group": "accents"}]"#,
        )
        .unwrap();
        assert_eq!(specs[0], GlyphSpec::new("A"));
        assert_eq!(specs[1], GlyphSpec::new("a").with_filename("lower_a"));
        assert_eq!(specs[2], GlyphSpec::new("\\u00e9").in_group("accents"));
    }
}
