//! Materialized file content.

use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{PackError, Result};

/// Extensions that are always copied byte-for-byte.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "tga", "gif", "bmp", "ogg", "wav", "mp3", "fsb", "zip", "ttf", "otf",
];

/// How a file's content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Text,
    Binary,
}

impl ContentKind {
    /// Pick a kind from the file extension.
    ///
    /// Anything that is neither JSON nor a known binary format is treated as
    /// line-oriented text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if ext == "json" {
            ContentKind::Json
        } else if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            ContentKind::Binary
        } else {
            ContentKind::Text
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Json => write!(f, "JSON"),
            ContentKind::Text => write!(f, "text"),
            ContentKind::Binary => write!(f, "binary"),
        }
    }
}

/// The content of one output file.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    /// Read and interpret a source file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| PackError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read source: {}", e),
        })?;

        match ContentKind::from_path(path) {
            ContentKind::Json => {
                let text = decode_text(bytes).map_err(|_| PackError::Parse {
                    message: format!("{} is not valid UTF-8", path.display()),
                    help: None,
                })?;
                parse_json(&text)
                    .map(Content::Json)
                    .map_err(|message| PackError::Parse {
                        message: format!("Invalid JSON in {}: {}", path.display(), message),
                        help: None,
                    })
            }
            ContentKind::Text => match decode_text(bytes) {
                Ok(text) => Ok(Content::Text(text)),
                Err(bytes) => Ok(Content::Binary(bytes)),
            },
            ContentKind::Binary => Ok(Content::Binary(bytes)),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Json(_) => ContentKind::Json,
            Content::Text(_) => ContentKind::Text,
            Content::Binary(_) => ContentKind::Binary,
        }
    }

    /// Serialize for writing to disk.
    ///
    /// JSON is pretty-printed with four-space indentation, the layout game
    /// tooling expects.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Content::Json(value) => {
                let mut out = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
                serde::Serialize::serialize(value, &mut ser).map_err(|e| PackError::Build {
                    message: format!("Failed to serialize JSON: {}", e),
                    help: None,
                })?;
                Ok(out)
            }
            Content::Text(text) => Ok(text.as_bytes().to_vec()),
            Content::Binary(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Decode UTF-8, dropping a leading byte-order mark.
fn decode_text(bytes: Vec<u8>) -> std::result::Result<String, Vec<u8>> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text
            .strip_prefix('\u{feff}')
            .map(str::to_string)
            .unwrap_or(text)),
        Err(e) => Err(e.into_bytes()),
    }
}

/// Strict JSON first; game JSON often carries comments, so fall back to JSON5.
fn parse_json(text: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(text).or_else(|strict| {
        json5::from_str::<Value>(text).map_err(|_| strict.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(ContentKind::from_path(Path::new("RP/blocks.json")), ContentKind::Json);
        assert_eq!(ContentKind::from_path(Path::new("a.block.png")), ContentKind::Binary);
        assert_eq!(ContentKind::from_path(Path::new("texts/en_US.lang")), ContentKind::Text);
        assert_eq!(ContentKind::from_path(Path::new("main.ts")), ContentKind::Text);
        assert_eq!(ContentKind::from_path(Path::new("Makefile")), ContentKind::Text);
    }

    #[test]
    fn test_load_json_with_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        fs::write(&path, "{\n  // comment\n  \"format_version\": [1, 1, 0],\n}").unwrap();

        let content = Content::load(&path).unwrap();
        match content {
            Content::Json(value) => assert!(value.get("format_version").is_some()),
            other => panic!("expected JSON, got {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ \"a\": ").unwrap();

        assert!(matches!(Content::load(&path), Err(PackError::Parse { .. })));
    }

    #[test]
    fn test_load_text_strips_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en_US.lang");
        fs::write(&path, "\u{feff}pack.name=Test\n").unwrap();

        assert_eq!(
            Content::load(&path).unwrap(),
            Content::Text("pack.name=Test\n".to_string())
        );
    }

    #[test]
    fn test_non_utf8_text_becomes_binary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert_eq!(Content::load(&path).unwrap().kind(), ContentKind::Binary);
    }

    #[test]
    fn test_json_written_with_four_space_indent() {
        let content = Content::Json(json!({"a": [1]}));
        let text = String::from_utf8(content.to_bytes().unwrap()).unwrap();
        assert_eq!(text, "{\n    \"a\": [\n        1\n    ]\n}");
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let err = Content::load(Path::new("/nonexistent/source.json")).unwrap_err();
        assert!(matches!(err, PackError::Io { .. }));
    }
}
