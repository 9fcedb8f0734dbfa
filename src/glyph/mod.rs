//! Glyph rasterization: renders one PNG texture per requested character.
//!
//! The generator is a producer: the images it writes become sources of
//! ordinary mapping entries (see [`producer`]). Problems with a single
//! character are collected in the [`GlyphReport`] and never stop the other
//! characters from rendering.
//!
//! # Example
//!
//! ```ignore
//! use packmap::glyph::{generate, parse_letters, GlyphOptions};
//!
//! let options = GlyphOptions::new("letter_blocks").with_antialias(4);
//! let report = generate(&parse_letters("ABC"), &options)?;
//! println!("{} glyphs written", report.generated.len());
//! ```

mod audit;
mod builtin;
mod font;
pub mod producer;
mod raster;
mod spec;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{PackError, Result};
use crate::report::{Diagnostic, Report};
use crate::types::Colour;

pub use audit::{format_audit, AUDIT_FILENAME};
pub use builtin::BuiltinFace;
pub use font::{default_candidates, load_font_chain, GlyphFace, RasterGlyph, TrueTypeFace, DEFAULT_FONT_CANDIDATES};
pub use raster::{downsample, render_glyph, RasterOptions};
pub use spec::{decode_char, parse_letters, safe_filename, GlyphSpec};

/// Extension every generated texture carries.
pub const GLYPH_EXTENSION: &str = ".block.png";

/// Generator settings. Everything is passed in explicitly.
#[derive(Debug, Clone)]
pub struct GlyphOptions {
    pub output_dir: PathBuf,
    /// Custom font tried before the candidates.
    pub font_path: Option<PathBuf>,
    pub font_candidates: Vec<PathBuf>,
    pub font_size: f32,
    pub color: Colour,
    pub image_size: (u32, u32),
    pub background: Option<PathBuf>,
    /// Supersampling factor; 1 disables antialiasing.
    pub antialias: u32,
    /// Appended to every file stem, before `.block.png`.
    pub suffix: String,
}

impl GlyphOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            font_path: None,
            font_candidates: default_candidates(),
            font_size: 48.0,
            color: Colour::WHITE,
            image_size: (64, 64),
            background: None,
            antialias: 1,
            suffix: String::new(),
        }
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.font_candidates = candidates;
        self
    }

    pub fn with_antialias(mut self, factor: u32) -> Self {
        self.antialias = factor;
        self
    }

    fn raster(&self) -> RasterOptions {
        RasterOptions {
            width: self.image_size.0,
            height: self.image_size.1,
            font_size: self.font_size,
            color: self.color,
            supersample: self.antialias,
        }
    }
}

/// A glyph that was written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedGlyph {
    pub ch: char,
    /// File stem including the suffix.
    pub name: String,
    pub group: Option<String>,
    /// Path relative to the output directory.
    pub path: PathBuf,
}

/// Outcome of one generator call.
#[derive(Debug, Default)]
pub struct GlyphReport {
    /// Written glyphs, in request order.
    pub generated: Vec<GeneratedGlyph>,
    /// Per-character failures; each is a `GlyphRender` error.
    pub failures: Vec<PackError>,
    /// Face that was used.
    pub font: String,
}

impl GlyphReport {
    /// Failures as report diagnostics.
    pub fn to_report(&self) -> Report {
        let mut report = Report::new();
        for failure in &self.failures {
            report.push(
                Diagnostic::error("packmap::glyph", failure.to_string())
                    .with_help("The glyph was skipped; the rest of the set was generated"),
            );
        }
        report
    }
}

/// A character that passed validation and is ready to render.
struct Planned {
    ch: char,
    name: String,
    group: Option<String>,
    path: PathBuf,
}

/// Render every spec into `options.output_dir` and write the audit file.
///
/// Only setup problems (unwritable output directory, unreadable background,
/// audit write failure) are returned as errors.
pub fn generate(specs: &[GlyphSpec], options: &GlyphOptions) -> Result<GlyphReport> {
    fs::create_dir_all(&options.output_dir).map_err(|e| PackError::Io {
        path: options.output_dir.clone(),
        message: format!("Failed to create glyph output directory: {}", e),
    })?;

    let mut failures = Vec::new();
    let planned = plan(specs, options, &mut failures);

    let face = load_font_chain(options.font_path.as_deref(), &options.font_candidates);
    let raster_options = options.raster();
    let background = match &options.background {
        Some(path) => Some(raster::prepare_background(&load_background(path)?, &raster_options)),
        None => None,
    };

    let results: Vec<Result<GeneratedGlyph>> = planned
        .into_par_iter()
        .map(|glyph| render_one(face.as_ref(), glyph, &raster_options, background.as_ref(), &options.output_dir))
        .collect();

    let mut generated = Vec::new();
    for result in results {
        match result {
            Ok(glyph) => {
                debug!("Rendered {:?} to {}", glyph.ch, glyph.path.display());
                generated.push(glyph);
            }
            Err(e) => failures.push(e),
        }
    }
    for failure in &failures {
        warn!("{}", failure);
    }

    audit::write_audit(&options.output_dir, &generated)?;

    Ok(GlyphReport {
        generated,
        failures,
        font: face.name().to_string(),
    })
}

/// Decode, name and de-duplicate the request.
fn plan(specs: &[GlyphSpec], options: &GlyphOptions, failures: &mut Vec<PackError>) -> Vec<Planned> {
    let mut planned = Vec::new();
    let mut claimed: HashMap<PathBuf, char> = HashMap::new();

    for spec in specs {
        match plan_one(spec, options, &mut claimed) {
            Ok(Some(glyph)) => planned.push(glyph),
            Ok(None) => {}
            Err(e) => failures.push(e),
        }
    }

    planned
}

/// `Ok(None)` when the same character was already requested.
fn plan_one(spec: &GlyphSpec, options: &GlyphOptions, claimed: &mut HashMap<PathBuf, char>) -> Result<Option<Planned>> {
    let ch = spec.decode()?;
    if ch.is_whitespace() {
        return Err(PackError::GlyphRender {
            glyph: spec.raw.clone(),
            message: "whitespace has nothing to draw".to_string(),
        });
    }

    let name = format!("{}{}", spec.file_stem(ch)?, options.suffix);
    let group = spec.group_dir()?.map(str::to_string);
    let file = format!("{}{}", name, GLYPH_EXTENSION);
    let path = match &group {
        Some(group) => Path::new(group).join(file),
        None => PathBuf::from(file),
    };

    match claimed.get(&path) {
        Some(&owner) if owner == ch => Ok(None),
        Some(&owner) => Err(PackError::GlyphRender {
            glyph: spec.raw.clone(),
            message: format!("{} is already generated for {:?}", path.display(), owner),
        }),
        None => {
            claimed.insert(path.clone(), ch);
            Ok(Some(Planned { ch, name, group, path }))
        }
    }
}

fn render_one(
    face: &dyn GlyphFace,
    glyph: Planned,
    raster: &RasterOptions,
    background: Option<&RgbaImage>,
    output_dir: &Path,
) -> Result<GeneratedGlyph> {
    let image = render_glyph(face, glyph.ch, raster, background)?;

    let target = output_dir.join(&glyph.path);
    let fail = |message: String| PackError::GlyphRender {
        glyph: glyph.ch.to_string(),
        message,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| fail(format!("cannot create {}: {}", parent.display(), e)))?;
    }
    image
        .save(&target)
        .map_err(|e| fail(format!("cannot write {}: {}", target.display(), e)))?;

    Ok(GeneratedGlyph {
        ch: glyph.ch,
        name: glyph.name,
        group: glyph.group,
        path: glyph.path,
    })
}

fn load_background(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| PackError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to load background image: {}", e),
        })
}
