//! # exif-kit
//!
//! Small EXIF tools for a photo folder — copy a full EXIF block from one image
//! to another, backfill missing capture dates from file timestamps, and build
//! a tree of EXIF-preserving JPEG thumbnails.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_kit::copier::copy_metadata;
//! use std::path::Path;
//!
//! fn main() -> exif_kit::Result<()> {
//!     // Back up edited.jpg, then give it every tag of camera.jpg
//!     let report = copy_metadata(Path::new("edited.jpg"), Path::new("camera.jpg"), "_origin")?;
//!     println!("Backup: {}", report.backup.display());
//!     if let Some(summary) = report.summary {
//!         println!("{summary}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use exif::Tag;
//! use exif_kit::metadata::{ExifTagSet, TagValue, write_exif};
//! use std::path::Path;
//!
//! fn main() -> exif_kit::Result<()> {
//!     let path = Path::new("photo.jpg");
//!     let mut tags = ExifTagSet::from_path(path)?.unwrap_or_default();
//!     tags.set(Tag::DateTime, TagValue::ascii("2024:01:15 10:30:00"));
//!     write_exif(path, &tags)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | EXIF read | EXIF write | Thumbnail source |
//! |--------|-----------|------------|------------------|
//! | JPEG (`.jpg`, `.jpeg`) | yes | yes | yes |
//! | PNG (`.png`) | yes | yes | yes |
//! | WebP (`.webp`) | yes | yes | yes |
//! | TIFF (`.tif`, `.tiff`) | yes | no | no |
//! | BMP (`.bmp`) | no | no | no |
//! | HEIC/HEIF (`.heic`, `.heif`) | yes | no | discovered, not decodable |
//!
//! ## Modules
//!
//! - [`backfill`] — fill in `DateTime`/`DateTimeOriginal` from file timestamps
//! - [`config`] — Configuration types and loading/saving
//! - [`copier`] — backup-then-copy of a full EXIF block
//! - [`metadata`] — EXIF tag set, reader and writer
//! - [`pipeline`] — image discovery, format detection and backups
//! - [`resolve`] — user path resolution and prompting
//! - [`thumbnail`] — EXIF-preserving JPEG thumbnail generation

pub mod backfill;
pub mod config;
pub mod copier;
mod error;
pub mod metadata;
pub mod pipeline;
pub mod resolve;
pub mod thumbnail;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod test_support;
