use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration shared by the three tools.
///
/// Every section falls back to its defaults when missing, so a config file
/// only needs the values that differ.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_kit::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.thumbnails.max_width = 1080;
/// config.thumbnails.max_height = 1080;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Naming of backup copies made before a file is modified.
    pub backup: BackupConfig,
    /// Thumbnail size, quality and output location.
    pub thumbnails: ThumbnailConfig,
    /// Interactive console behavior.
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Inserted between the file stem and the extension: `photo_origin.jpg`.
    pub suffix: String,
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Bounding box the thumbnail is shrunk into.
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1–100.
    pub quality: u8,
    /// Output directory name, relative to the scanned root.
    pub output_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Wait for Enter before the copy tool exits.
    pub pause_on_exit: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            suffix: "_origin".to_string(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: 720,
            max_height: 720,
            quality: 85,
            output_dir: "thumbnails".to_string(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            pause_on_exit: true,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Reject values the tools cannot work with.
    pub fn validate(&self) -> Result<()> {
        let thumbs = &self.thumbnails;
        if thumbs.max_width == 0 || thumbs.max_height == 0 {
            anyhow::bail!("thumbnails.max_width and max_height must be positive");
        }
        if !(1..=100).contains(&thumbs.quality) {
            anyhow::bail!("thumbnails.quality must be between 1 and 100");
        }
        if thumbs.output_dir.trim().is_empty() {
            anyhow::bail!("thumbnails.output_dir must not be empty");
        }
        if self.backup.suffix.is_empty() {
            anyhow::bail!("backup.suffix must not be empty");
        }
        Ok(())
    }
}
