//! EXIF metadata: the sectioned tag set, reading it out of image files, and
//! writing it back.
//!
//! - [`ExifTagSet::from_path`] — read the EXIF block of any supported image
//! - [`encode_exif`] / [`write_exif`] — serialize a tag set and splice it into
//!   a JPEG, PNG or WebP file without touching the pixel data

mod reader;
mod summary;
mod tags;
mod writer;

pub use summary::ExifSummary;
pub use tags::{ExifTagSet, Section, TagValue};
pub use writer::{embed_exif, encode_exif, write_exif, write_raw_exif};
