//! Glyph sets declared in map files.
//!
//! A `{"generate_glyphs": {...}}` item renders its letters into the module
//! and is replaced in the entry sequence by one mapping entry per written
//! image:
//!
//! ```json
//! {
//!     "generate_glyphs": {
//!         "letters": "ABC",
//!         "font_size": 48,
//!         "text_color": "#000000",
//!         "antialias": true,
//!         "output_dir": "letter_blocks",
//!         "map_item": { "target": "AUTO_FLAT_SUBFOLDER", "on_conflict": "skip" }
//!     }
//! }
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::discovery::slash_path;
use crate::error::{PackError, Result};
use crate::types::{Colour, ConflictPolicy, MappingEntry, ModuleContext, TargetSpec};

use super::{generate, parse_letters, GlyphOptions, GlyphReport, GlyphSpec};

/// Supersampling factor used when antialiasing is switched on with `true`.
pub const DEFAULT_SUPERSAMPLE: u32 = 4;

/// Letters as a plain string or as a list of per-glyph specs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Letters {
    Text(String),
    List(Vec<GlyphSpec>),
}

impl Letters {
    pub fn specs(&self) -> Vec<GlyphSpec> {
        match self {
            Letters::Text(text) => parse_letters(text),
            Letters::List(specs) => specs.clone(),
        }
    }
}

/// `true`/`false` or an explicit supersampling factor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Antialias {
    Enabled(bool),
    Factor(u32),
}

impl Default for Antialias {
    fn default() -> Self {
        Antialias::Enabled(false)
    }
}

impl Antialias {
    pub fn factor(self) -> u32 {
        match self {
            Antialias::Enabled(true) => DEFAULT_SUPERSAMPLE,
            Antialias::Enabled(false) => 1,
            Antialias::Factor(factor) => factor.max(1),
        }
    }
}

/// How the yielded entries are mapped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapItem {
    pub target: String,
    pub on_conflict: ConflictPolicy,
}

impl Default for MapItem {
    fn default() -> Self {
        Self {
            target: "AUTO_FLAT_SUBFOLDER".to_string(),
            on_conflict: ConflictPolicy::Skip,
        }
    }
}

/// One glyph set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlyphSetConfig {
    pub letters: Letters,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_text_color")]
    pub text_color: Colour,
    #[serde(default = "default_image_size")]
    pub image_size: [u32; 2],
    #[serde(default)]
    pub background_image_path: Option<PathBuf>,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub antialias: Antialias,
    /// Module-relative directory the images are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub map_item: MapItem,
}

fn default_font_size() -> f32 {
    48.0
}

fn default_text_color() -> Colour {
    Colour::WHITE
}

fn default_image_size() -> [u32; 2] {
    [64, 64]
}

fn default_output_dir() -> String {
    "letter_blocks".to_string()
}

impl GlyphSetConfig {
    /// Generator options with paths resolved against the module root.
    pub fn options(&self, module_root: &Path, font_candidates: &[PathBuf]) -> Result<GlyphOptions> {
        check_relative(&self.output_dir)?;
        if self.image_size.contains(&0) || self.font_size <= 0.0 {
            return Err(PackError::Parse {
                message: "Glyph image size and font size must be positive".to_string(),
                help: None,
            });
        }

        Ok(GlyphOptions {
            output_dir: module_root.join(&self.output_dir),
            font_path: self.font_path.as_ref().map(|p| module_root.join(p)),
            font_candidates: font_candidates.to_vec(),
            font_size: self.font_size,
            color: self.text_color,
            image_size: (self.image_size[0], self.image_size[1]),
            background: self.background_image_path.as_ref().map(|p| module_root.join(p)),
            antialias: self.antialias.factor(),
            suffix: self.suffix.clone(),
        })
    }

    /// Render the set and return one entry per written image.
    pub fn run(
        &self,
        module: &Arc<ModuleContext>,
        index: usize,
        font_candidates: &[PathBuf],
    ) -> Result<(Vec<MappingEntry>, GlyphReport)> {
        let target = TargetSpec::parse(&self.map_item.target)?;
        let options = self.options(&module.root, font_candidates)?;
        let report = generate(&self.letters.specs(), &options)?;

        let entries = report
            .generated
            .iter()
            .map(|glyph| {
                let source = slash_path(&Path::new(&self.output_dir).join(&glyph.path));
                MappingEntry::new(module.clone(), source, target.clone())
                    .at(index)
                    .on_conflict(self.map_item.on_conflict)
            })
            .collect();

        Ok((entries, report))
    }
}

fn check_relative(dir: &str) -> Result<()> {
    let escapes = Path::new(dir)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PackError::Parse {
            message: format!("Glyph output_dir '{}' must stay inside the module", dir),
            help: None,
        });
    }
    Ok(())
}
