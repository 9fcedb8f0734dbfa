pub mod build;
pub mod check;
pub mod completions;
pub mod glyphs;

use clap::{Parser, Subcommand};

/// packmap - assemble add-on packs from declarative mapping files
#[derive(Parser, Debug)]
#[command(name = "packmap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the pack into a staged output directory
    Build(build::BuildArgs),

    /// Resolve every entry and list the planned output without writing it
    Check(check::CheckArgs),

    /// Render glyph textures for a set of characters
    Glyphs(glyphs::GlyphsArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
