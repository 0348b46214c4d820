use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use exif_kit::config;
use exif_kit::copier::{copy_metadata, summarize_exif};
use exif_kit::resolve::{ImageRef, ValidationError, prompt_until, resolve_source, resolve_target};

#[derive(Parser, Debug)]
#[command(
    name = "exif-copy",
    version,
    about = "Copy the full EXIF block of one image onto another, keeping a backup of the target"
)]
struct Cli {
    /// Image that receives the metadata (prompted for if omitted)
    #[arg(short, long, value_name = "FILE")]
    target: Option<String>,

    /// Image the metadata is copied from (prompted for if omitted)
    #[arg(short, long, value_name = "FILE")]
    source: Option<String>,

    /// Folder relative file names are looked up in (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Exit without waiting for Enter
    #[arg(long)]
    no_pause: bool,

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

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let config = config::Config::load(cli.config.as_deref())?;
    let base_dir = match cli.dir {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    if !base_dir.is_dir() {
        anyhow::bail!("Not a directory: {}", base_dir.display());
    }

    println!("{}", "=".repeat(60));
    println!("EXIF metadata copy");
    println!("{}", "=".repeat(60));
    println!("Working directory: {}", base_dir.display());
    println!();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let target = pick(
        cli.target.as_deref(),
        &mut input,
        &mut output,
        "Target image (receives the metadata): ",
        |s| resolve_target(s, &base_dir),
    )?;
    let source = pick(
        cli.source.as_deref(),
        &mut input,
        &mut output,
        "Source image (metadata is read from): ",
        |s| resolve_source(s, &base_dir, &target.path),
    )?;

    println!();
    println!("Target: {}", target.path.display());
    println!("Source: {}", source.path.display());
    println!();

    match summarize_exif(&source.path) {
        Ok(Some(summary)) => {
            println!("EXIF on source:");
            println!("{summary}");
            println!();
        }
        Ok(None) => log::warn!("Source {} has no EXIF data", source.path.display()),
        Err(e) => log::warn!("Could not read EXIF of {}: {e}", source.path.display()),
    }

    match copy_metadata(&target.path, &source.path, &config.backup.suffix) {
        Ok(report) => {
            println!("Backup: {}", report.backup.display());
            match report.summary {
                Some(summary) => {
                    println!("EXIF now on target:");
                    println!("{summary}");
                }
                None => println!("EXIF written, but could not be read back for a summary"),
            }
        }
        Err(e) => log::error!("Copy failed: {e}"),
    }

    if config.console.pause_on_exit && !cli.no_pause {
        pause(&mut input, &mut output)?;
    }

    Ok(())
}

/// Validate a path given on the command line, or prompt until one is valid.
fn pick<R, W, F>(
    given: Option<&str>,
    input: &mut R,
    output: &mut W,
    prompt: &str,
    mut validate: F,
) -> Result<ImageRef>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> Result<ImageRef, ValidationError>,
{
    match given {
        Some(value) => validate(value).map_err(|e| anyhow::anyhow!("{e}")),
        None => prompt_until(input, output, prompt, validate).context("No image selected"),
    }
}

fn pause<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<()> {
    write!(output, "\nPress Enter to exit...")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}
