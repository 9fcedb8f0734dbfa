//! Check command implementation.
//!
//! Resolves the project in memory and lists every planned output file with
//! the entries that produced it. The output directory is never touched;
//! glyph sets still render into their modules since later entries discover
//! their images.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;

use crate::discovery::load_project;
use crate::error::Result;
use crate::output::{display_path, plural, Printer};
use crate::pipeline::{self, load_scope_file};
use crate::resolve::OutputTree;

/// Resolve every entry and list the planned output without writing it
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project root holding pack.yaml (default: current directory)
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// JSON file with extra global scope values
    #[arg(long)]
    pub scope: Option<PathBuf>,
}

pub fn run(args: CheckArgs, printer: &Printer) -> Result<()> {
    printer.status("Checking", &display_path(&args.root));
    let project = load_project(&args.root)?;
    let extra_scope = args.scope.as_deref().map(load_scope_file).transpose()?;

    let plan = pipeline::plan(&project, extra_scope)?;
    print!("{}", format_plan(&plan.tree));
    printer.report(&plan.report);

    printer.success(
        "Checked",
        &format!(
            "{} planned from {}",
            plural(plan.tree.len(), "file", "files"),
            plural(plan.entries, "entry", "entries")
        ),
    );
    Ok(())
}

/// One line per output file, contributors indented below it.
pub fn format_plan(tree: &OutputTree) -> String {
    let mut out = String::new();
    for (path, file) in tree.iter() {
        let _ = writeln!(out, "{} [{}] <- {}", path.display(), file.content.kind(), file.provenance);
        for contributor in &file.contributors {
            let _ = writeln!(out, "    + {}", contributor);
        }
    }
    out
}
