//! Glyphs command implementation.
//!
//! Runs the glyph generator on its own, outside of any map file.

use std::path::PathBuf;

use clap::Args;

use crate::error::Result;
use crate::glyph::{default_candidates, generate, parse_letters, GlyphOptions};
use crate::output::{display_path, plural, Printer};
use crate::types::Colour;

/// Render glyph textures for a set of characters
#[derive(Args, Debug)]
pub struct GlyphsArgs {
    /// Characters to render; escapes such as `\u00e9` are decoded
    pub letters: String,

    /// Output directory
    #[arg(long, short, default_value = "letter_blocks")]
    pub output: PathBuf,

    /// Font file tried before the system fonts
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Font size in pixels
    #[arg(long, default_value = "48")]
    pub font_size: f32,

    /// Text colour (#RGB, #RGBA, #RRGGBB or #RRGGBBAA)
    #[arg(long, default_value = "#FFFFFF")]
    pub color: Colour,

    /// Image width and height in pixels
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], default_values_t = [64, 64])]
    pub size: Vec<u32>,

    /// Background image, resized to the image size
    #[arg(long)]
    pub background: Option<PathBuf>,

    /// Supersampling factor (1 disables antialiasing)
    #[arg(long, default_value = "1")]
    pub antialias: u32,

    /// Appended to every file name before the extension
    #[arg(long, default_value = "")]
    pub suffix: String,
}

impl GlyphsArgs {
    fn options(&self) -> GlyphOptions {
        let mut options = GlyphOptions::new(&self.output)
            .with_candidates(default_candidates())
            .with_antialias(self.antialias.max(1));
        options.font_path = self.font.clone();
        options.font_size = self.font_size;
        options.color = self.color;
        if let [width, height] = self.size.as_slice() {
            options.image_size = (*width, *height);
        }
        options.background = self.background.clone();
        options.suffix = self.suffix.clone();
        options
    }
}

pub fn run(args: GlyphsArgs, printer: &Printer) -> Result<()> {
    let specs = parse_letters(&args.letters);
    let options = args.options();

    printer.status(
        "Rendering",
        &format!("{} to {}", plural(specs.len(), "glyph", "glyphs"), display_path(&options.output_dir)),
    );
    let report = generate(&specs, &options)?;
    printer.report(&report.to_report());

    printer.success(
        "Finished",
        &format!(
            "{} {}",
            plural(report.generated.len(), "glyph", "glyphs"),
            printer.dim(&format!("({})", report.font))
        ),
    );
    Ok(())
}
