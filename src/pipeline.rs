use serde::Serialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Extensions the copy and date tools accept.
pub const EDITABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp"];

/// Extensions the thumbnail generator picks up.
pub const THUMBNAIL_SOURCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];

/// Container format of an image file, determined by its extension.
///
/// Only JPEG, PNG and WebP can have their EXIF block replaced in place;
/// the other kinds are readable but never rewritten.
///
/// # Example
///
/// ```rust
/// use exif_kit::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("IMG_0001.JPG")), Some(ImageKind::Jpeg));
/// assert!(!ImageKind::Bmp.can_carry_exif());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
    /// HEIC/HEIF — EXIF readable, never written
    Heif,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "heic" | "heif" => Some(Self::Heif),
            _ => None,
        }
    }

    /// Whether an EXIF block can be spliced into this container.
    pub fn can_carry_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::WebP)
    }
}

/// Check if a path has one of the given (lowercase) extensions.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files directly inside `dir` (no recursion), sorted by file name.
pub fn list_images(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for entry in fs::read_dir(dir).map_err(Error::io(dir))? {
        let path = entry.map_err(Error::io(dir))?.path();
        if path.is_file() && has_extension(&path, extensions) {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}

/// Image files anywhere under `root`, skipping the `exclude` subtree.
///
/// Unreadable directory entries are logged and skipped.
pub fn walk_images(root: &Path, exclude: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != exclude)
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|p| p.is_file() && has_extension(p, extensions))
        .collect()
}

/// First free backup name for `path`: `<stem><suffix><ext>`, then
/// `<stem><suffix>_1<ext>`, `<stem><suffix>_2<ext>`, ...
pub fn backup_path(path: &Path, suffix: &str) -> Option<PathBuf> {
    candidate_backup_names(path, suffix).find(|candidate| !candidate.exists())
}

fn candidate_backup_names<'a>(path: &'a Path, suffix: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (0u64..).map(move |n| {
        let name = if n == 0 {
            format!("{stem}{suffix}{ext}")
        } else {
            format!("{stem}{suffix}_{n}{ext}")
        };
        path.with_file_name(name)
    })
}

/// Create a byte-identical backup of `path` beside it and return its path.
///
/// An existing file is never overwritten: the backup is created with
/// create-new semantics and moves on to the next free name on collision.
/// The original's modification time and permissions are carried over.
pub fn backup_file(path: &Path, suffix: &str) -> Result<PathBuf> {
    let backup_err = |e: io::Error| Error::Backup(e, path.into());

    let mut source = File::open(path).map_err(backup_err)?;
    let source_meta = source.metadata().map_err(backup_err)?;

    for candidate in candidate_backup_names(path, suffix) {
        let mut dest = match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(backup_err(e)),
        };

        io::copy(&mut source, &mut dest).map_err(backup_err)?;
        if let Ok(modified) = source_meta.modified() {
            if let Err(e) = dest.set_modified(modified) {
                log::debug!("Could not carry mtime to {}: {e}", candidate.display());
            }
        }
        fs::set_permissions(&candidate, source_meta.permissions()).map_err(backup_err)?;

        log::debug!("Backup created: {}", candidate.display());
        return Ok(candidate);
    }

    Err(backup_err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free backup name left",
    )))
}

/// Counters for a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.errors
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed: {}, Skipped: {}, Errors: {}",
            self.processed, self.skipped, self.errors
        )
    }
}
