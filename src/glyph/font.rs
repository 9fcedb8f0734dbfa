//! Font faces and the font fallback chain.

use std::fs;
use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use log::{debug, info, warn};

use crate::error::{PackError, Result};

use super::builtin::BuiltinFace;

/// Common system fonts tried when no custom font is given.
pub const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A rasterized glyph: 8-bit coverage, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    pub width: usize,
    pub height: usize,
    /// Horizontal offset of the bitmap's left edge from the pen position.
    pub left: i32,
    /// Height of the bitmap's top edge above the baseline.
    pub top: i32,
    pub coverage: Vec<u8>,
}

/// Something that can turn characters into coverage bitmaps.
pub trait GlyphFace: Send + Sync {
    /// Name shown in logs and reports.
    fn name(&self) -> &str;

    /// Rasterize `ch` at `px` pixels per em; `None` if the face has no glyph.
    fn rasterize(&self, ch: char, px: f32) -> Option<RasterGlyph>;
}

/// A TrueType/OpenType font loaded through `fontdue`.
pub struct TrueTypeFace {
    name: String,
    font: Font,
}

impl TrueTypeFace {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| PackError::FontLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_bytes(path, &data)
    }

    pub fn from_bytes(path: &Path, data: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|e| PackError::FontLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: path.display().to_string(),
            font,
        })
    }
}

impl GlyphFace for TrueTypeFace {
    fn name(&self) -> &str {
        &self.name
    }

    fn rasterize(&self, ch: char, px: f32) -> Option<RasterGlyph> {
        if self.font.lookup_glyph_index(ch) == 0 {
            return None;
        }
        let (metrics, coverage) = self.font.rasterize(ch, px);
        Some(RasterGlyph {
            width: metrics.width,
            height: metrics.height,
            left: metrics.xmin,
            top: metrics.ymin + metrics.height as i32,
            coverage,
        })
    }
}

/// Pick the first loadable font: `custom`, then `candidates` in order, then
/// the built-in bitmap font. Never fails.
pub fn load_font_chain(custom: Option<&Path>, candidates: &[PathBuf]) -> Box<dyn GlyphFace> {
    for path in custom.into_iter().chain(candidates.iter().map(PathBuf::as_path)) {
        if !path.exists() {
            if Some(path) == custom {
                warn!("Font {} does not exist, trying fallbacks", path.display());
            } else {
                debug!("Font candidate {} not present", path.display());
            }
            continue;
        }
        match TrueTypeFace::load(path) {
            Ok(face) => {
                info!("Using font {}", path.display());
                return Box::new(face);
            }
            Err(e) => warn!("{}", e),
        }
    }

    info!("No usable font found, using the built-in bitmap font");
    Box::new(BuiltinFace)
}

/// The default candidate list as paths.
pub fn default_candidates() -> Vec<PathBuf> {
    DEFAULT_FONT_CANDIDATES.iter().map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_chain_falls_back_to_builtin() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.ttf");
        fs::write(&broken, b"not a font").unwrap();

        let face = load_font_chain(
            Some(&dir.path().join("missing.ttf")),
            &[broken, dir.path().join("also-missing.ttf")],
        );
        assert_eq!(face.name(), "built-in");
    }

    #[test]
    fn test_broken_font_is_font_load_error() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.ttf");
        fs::write(&broken, b"not a font").unwrap();

        assert!(matches!(TrueTypeFace::load(&broken), Err(PackError::FontLoad { .. })));
        assert!(matches!(
            TrueTypeFace::load(&dir.path().join("missing.ttf")),
            Err(PackError::FontLoad { .. })
        ));
    }

    #[test]
    fn test_system_font_when_available() {
        let Some(path) = default_candidates().into_iter().find(|p| p.exists()) else {
            return;
        };
        let face = load_font_chain(None, &[path]);
        let glyph = face.rasterize('A', 32.0).unwrap();
        assert!(glyph.width > 0 && glyph.height > 0);
        assert!(glyph.top > 0);
    }
}
