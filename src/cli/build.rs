//! Build command implementation.
//!
//! Loads the project, runs producers, resolves every entry and promotes the
//! staged pack over the output directory.

use std::path::PathBuf;

use clap::Args;

use crate::discovery::load_project;
use crate::error::Result;
use crate::output::{display_path, plural, Printer};
use crate::pipeline::{self, load_scope_file};

/// Build the pack into a staged output directory
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project root holding pack.yaml (default: current directory)
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Output directory (default: `output` from pack.yaml, relative to the root)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// JSON file with extra global scope values
    #[arg(long)]
    pub scope: Option<PathBuf>,
}

pub fn run(args: BuildArgs, printer: &Printer) -> Result<()> {
    printer.status("Loading", &display_path(&args.root));
    let project = load_project(&args.root)?;
    let extra_scope = args.scope.as_deref().map(load_scope_file).transpose()?;
    let output = args
        .output
        .unwrap_or_else(|| project.root.join(&project.manifest.output));

    printer.status(
        "Resolving",
        &format!(
            "{} from {}",
            plural(project.item_count(), "item", "items"),
            plural(project.modules.len(), "module", "modules")
        ),
    );
    let summary = pipeline::build(&project, &output, extra_scope)?;

    for glyphs in &summary.plan.glyphs {
        printer.info(
            "Rendered",
            &format!("{} {}", plural(glyphs.generated.len(), "glyph", "glyphs"), printer.dim(&format!("({})", glyphs.font))),
        );
    }
    printer.report(&summary.plan.report);

    printer.success(
        "Finished",
        &format!("{} to {}", plural(summary.files, "file", "files"), display_path(&summary.output)),
    );
    Ok(())
}
