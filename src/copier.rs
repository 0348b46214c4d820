use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::metadata::{ExifSummary, ExifTagSet, encode_exif, write_raw_exif};
use crate::pipeline::{ImageKind, backup_file};
use crate::resolve::same_file;
use crate::{Error, Result};

/// Result of a successful [`copy_metadata`].
#[derive(Debug, Clone, Serialize)]
pub struct CopyReport {
    /// Untouched copy of the target as it was before the write.
    pub backup: PathBuf,
    /// The target's EXIF after the write, `None` if it could not be re-read.
    pub summary: Option<ExifSummary>,
}

/// Read and summarize the EXIF of an image, `None` if it has none.
pub fn summarize_exif(path: &Path) -> Result<Option<ExifSummary>> {
    Ok(ExifTagSet::from_path(path)?.map(|tags| ExifSummary::from_tags(&tags)))
}

/// Replace the whole EXIF block of `target` with the one in `source`.
///
/// The target is backed up beside itself first. Nothing is written when the
/// source has no EXIF, the target cannot hold an EXIF block, or the source
/// tags cannot be serialized. Pixel data of the target is never re-encoded.
pub fn copy_metadata(target: &Path, source: &Path, backup_suffix: &str) -> Result<CopyReport> {
    if same_file(target, source) {
        return Err(Error::SameFile(target.to_path_buf()));
    }

    let tags = ExifTagSet::from_path(source)?
        .ok_or_else(|| Error::NoExifData(source.to_path_buf()))?;
    log::info!("Read {} EXIF tags from {}", tags.len(), source.display());

    if !ImageKind::from_path(target).is_some_and(ImageKind::can_carry_exif) {
        return Err(Error::UnsupportedContainer(target.display().to_string()));
    }
    let raw = encode_exif(&tags)?;

    let backup = backup_file(target, backup_suffix)?;
    log::info!("Backup created: {}", backup.display());

    write_raw_exif(target, raw)?;
    log::info!("EXIF copied to {}", target.display());

    let summary = match summarize_exif(target) {
        Ok(Some(summary)) => Some(summary),
        Ok(None) => {
            log::warn!("No EXIF found in {} after writing", target.display());
            None
        }
        Err(e) => {
            log::warn!("Could not re-read EXIF of {}: {e}", target.display());
            None
        }
    };

    Ok(CopyReport { backup, summary })
}
