//! The plain-text glyph audit file.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{PackError, Result};

use super::GeneratedGlyph;

/// File name of the audit file inside the output directory.
pub const AUDIT_FILENAME: &str = "glyph_map.txt";

/// One line per glyph: `'A' -> upper_a -> U+0041 -> latin`.
pub fn format_audit(glyphs: &[GeneratedGlyph]) -> String {
    let mut out = String::new();
    for glyph in glyphs {
        let _ = writeln!(
            out,
            "{:?} -> {} -> U+{:04X} -> {}",
            glyph.ch,
            glyph.name,
            glyph.ch as u32,
            glyph.group.as_deref().unwrap_or("-")
        );
    }
    out
}

pub fn write_audit(output_dir: &Path, glyphs: &[GeneratedGlyph]) -> Result<()> {
    let path = output_dir.join(AUDIT_FILENAME);
    fs::write(&path, format_audit(glyphs)).map_err(|e| PackError::Io {
        path,
        message: format!("Failed to write glyph audit: {}", e),
    })
}
