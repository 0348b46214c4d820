use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use exif_kit::config;
use exif_kit::thumbnail::{ThumbnailSettings, generate_all};

#[derive(Parser, Debug)]
#[command(
    name = "exif-thumbs",
    version,
    about = "Generate EXIF-preserving JPEG thumbnails for every image under a folder"
)]
struct Cli {
    /// Root folder to scan recursively (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Longest allowed width and height in pixels
    #[arg(long, value_name = "PX", value_parser = clap::value_parser!(u32).range(1..))]
    max_size: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(short, long, value_name = "Q", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

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

    let config = config::Config::load(cli.config.as_deref())?;
    let mut settings = ThumbnailSettings::from(&config.thumbnails);

    // CLI flags override config
    if let Some(px) = cli.max_size {
        settings.max_width = px;
        settings.max_height = px;
    }
    if let Some(quality) = cli.quality {
        settings.quality = quality;
    }

    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    log::info!(
        "Generating thumbnails in: {}",
        root.join(&settings.output_dir).display()
    );
    log::info!(
        "Max size: {}x{}, quality {}",
        settings.max_width,
        settings.max_height,
        settings.quality
    );

    let tally = generate_all(&root, &settings);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&tally)?);
    } else {
        println!();
        println!("Done! {tally}");
    }

    Ok(())
}
