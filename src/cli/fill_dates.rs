use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use exif_kit::{backfill, config};

#[derive(Parser, Debug)]
#[command(
    name = "exif-fill-dates",
    version,
    about = "Give undated images an EXIF date taken from their file timestamps"
)]
struct Cli {
    /// Folder to scan, not recursive (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output the tally as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Only validated here: nothing in it changes how dates are filled.
    config::Config::load(cli.config.as_deref())?;

    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    log::info!("Scanning {}", dir.display());

    let tally = backfill::backfill_directory(&dir)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&tally)?);
    } else {
        println!();
        println!("Done! {tally}");
    }

    Ok(())
}
