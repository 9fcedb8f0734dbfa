use clap::Parser;
use miette::Result;
use packmap::cli::{Cli, Commands};
use packmap::output::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    let printer = Printer::new();
    let command = match &cli.command {
        Commands::Build(_) => "build",
        Commands::Check(_) => "check",
        Commands::Glyphs(_) => "glyphs",
        Commands::Completions(_) => "completions",
    };
    let result = match cli.command {
        Commands::Build(args) => packmap::cli::build::run(args, &printer),
        Commands::Check(args) => packmap::cli::check::run(args, &printer),
        Commands::Glyphs(args) => packmap::cli::glyphs::run(args, &printer),
        Commands::Completions(args) => packmap::cli::completions::run(args),
    };

    if let Err(e) = result {
        printer.error("Failed", &format!("packmap {}", command));
        return Err(e.into());
    }
    Ok(())
}
