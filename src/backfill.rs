//! Filling in missing capture dates from file timestamps.
//!
//! An image counts as dated when any of `DateTimeOriginal`,
//! `DateTimeDigitized` or `DateTime` is present and non-empty, whatever its
//! value type. Undated images get all three set to the earlier of the file's
//! creation and modification times, in local time.

use chrono::{DateTime, Local};
use exif::Tag;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::metadata::{ExifTagSet, TagValue, write_exif};
use crate::pipeline::{EDITABLE_EXTENSIONS, Tally, list_images};
use crate::{Error, Result};

/// EXIF date layout: `2024:01:15 10:30:00`.
pub const DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// What [`backfill_file`] did to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// A date tag was already present; the file was not touched.
    AlreadyDated,
    /// All three date tags were written with `date`.
    Filled {
        date: String,
        /// The image had no readable EXIF, so a new block was started.
        fresh_tag_set: bool,
    },
}

/// Whether any of the three date tags is present with a non-empty value.
pub fn has_date(tags: &ExifTagSet) -> bool {
    DATE_TAGS
        .iter()
        .any(|&tag| tags.get(tag).is_some_and(|value| !value.is_empty()))
}

/// The earlier of two optional timestamps.
pub fn pick_earliest(created: Option<SystemTime>, modified: Option<SystemTime>) -> Option<SystemTime> {
    match (created, modified) {
        (Some(c), Some(m)) => Some(c.min(m)),
        (c, m) => c.or(m),
    }
}

/// Earlier of creation and modification time.
///
/// Where the filesystem does not record a birth time, the inode change time
/// stands in for it. That is only an approximation: it moves on chmod and
/// rename too.
pub fn earliest_file_time(meta: &Metadata) -> Option<SystemTime> {
    let created = meta.created().ok().or_else(|| status_change_time(meta));
    pick_earliest(created, meta.modified().ok())
}

#[cfg(unix)]
fn status_change_time(meta: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn status_change_time(_meta: &Metadata) -> Option<SystemTime> {
    None
}

/// Format a timestamp as an EXIF date string in local time.
pub fn format_exif_date(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(DATE_FORMAT).to_string()
}

/// Set all three date tags to `date`.
pub fn stamp_dates(tags: &mut ExifTagSet, date: &str) {
    for tag in DATE_TAGS {
        tags.set(tag, TagValue::ascii(date));
    }
}

/// Give one image a date if it has none.
pub fn backfill_file(path: &Path) -> Result<BackfillOutcome> {
    let (mut tags, fresh_tag_set) = match ExifTagSet::from_path(path) {
        Ok(Some(tags)) => (tags, false),
        Ok(None) => (ExifTagSet::new(), true),
        Err(Error::Exif(e)) => {
            log::warn!("Unreadable EXIF in {}, starting fresh: {e}", path.display());
            (ExifTagSet::new(), true)
        }
        Err(e) => return Err(e),
    };

    if has_date(&tags) {
        return Ok(BackfillOutcome::AlreadyDated);
    }

    let meta = std::fs::metadata(path).map_err(Error::io(path))?;
    let time = earliest_file_time(&meta).ok_or_else(|| {
        Error::Io(
            io::Error::new(io::ErrorKind::Unsupported, "no file timestamps available"),
            path.into(),
        )
    })?;
    let date = format_exif_date(time);

    stamp_dates(&mut tags, &date);
    write_exif(path, &tags)?;

    Ok(BackfillOutcome::Filled {
        date,
        fresh_tag_set,
    })
}

/// Backfill every image directly inside `dir`, in file-name order.
///
/// Per-file failures are logged and counted; only an unreadable directory
/// fails the whole run.
pub fn backfill_directory(dir: &Path) -> Result<Tally> {
    let images = list_images(dir, EDITABLE_EXTENSIONS)?;
    log::info!("Found {} image(s) in {}", images.len(), dir.display());

    let mut tally = Tally::default();
    for path in &images {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        match backfill_file(path) {
            Ok(BackfillOutcome::AlreadyDated) => {
                log::info!("{name}: already dated, skipped");
                tally.skipped += 1;
            }
            Ok(BackfillOutcome::Filled {
                date,
                fresh_tag_set,
            }) => {
                if fresh_tag_set {
                    log::info!("{name}: no EXIF found, created new block with date {date}");
                } else {
                    log::info!("{name}: date set to {date}");
                }
                tally.processed += 1;
            }
            Err(e) => {
                log::error!("{name}: {e}");
                tally.errors += 1;
            }
        }
    }

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_jpeg;
    use chrono::TimeZone;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn tags_with(tag: Tag, value: TagValue) -> ExifTagSet {
        let mut set = ExifTagSet::new();
        set.set(tag, value);
        set
    }

    #[test]
    fn date_detection() {
        assert!(!has_date(&ExifTagSet::new()));
        assert!(has_date(&tags_with(Tag::DateTime, TagValue::ascii("2020:01:01 00:00:00"))));
        assert!(has_date(&tags_with(
            Tag::DateTimeDigitized,
            TagValue::ascii("2020:01:01 00:00:00")
        )));
        assert!(has_date(&tags_with(Tag::DateTimeOriginal, TagValue::ascii("    "))));
        assert!(has_date(&tags_with(
            Tag::DateTimeOriginal,
            TagValue::Undefined(b"2019:01:01 00:00:00".to_vec())
        )));
        assert!(!has_date(&tags_with(Tag::DateTimeOriginal, TagValue::ascii("\0\0"))));
        assert!(!has_date(&tags_with(Tag::DateTimeOriginal, TagValue::Ascii(vec![]))));
        assert!(!has_date(&tags_with(Tag::Make, TagValue::ascii("Canon"))));
    }

    #[test]
    fn earliest_of_two() {
        let early = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let late = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000);
        assert_eq!(pick_earliest(Some(late), Some(early)), Some(early));
        assert_eq!(pick_earliest(Some(early), Some(late)), Some(early));
        assert_eq!(pick_earliest(None, Some(late)), Some(late));
        assert_eq!(pick_earliest(Some(early), None), Some(early));
        assert_eq!(pick_earliest(None, None), None);
    }

    #[test]
    fn exif_date_format() {
        let local = Local.with_ymd_and_hms(2020, 5, 17, 8, 9, 10).single().unwrap();
        assert_eq!(format_exif_date(SystemTime::from(local)), "2020:05:17 08:09:10");
    }

    #[test]
    fn fills_all_three_tags_from_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.jpg");
        write_jpeg(&path, 8, 8);
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        File::options().write(true).open(&path).unwrap().set_modified(old).unwrap();

        let outcome = backfill_file(&path).unwrap();
        let expected = format_exif_date(old);
        assert_eq!(
            outcome,
            BackfillOutcome::Filled {
                date: expected.clone(),
                fresh_tag_set: true
            }
        );

        let tags = ExifTagSet::from_path(&path).unwrap().unwrap();
        for tag in DATE_TAGS {
            assert_eq!(tags.text(tag).as_deref(), Some(expected.as_str()));
        }
    }

    #[test]
    fn creation_time_wins_when_earlier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.jpg");
        write_jpeg(&path, 8, 8);
        let later = SystemTime::now() + Duration::from_secs(3600);
        File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();

        let meta = fs::metadata(&path).unwrap();
        let created = meta
            .created()
            .ok()
            .or_else(|| status_change_time(&meta))
            .unwrap();
        assert!(created < later);

        let outcome = backfill_file(&path).unwrap();
        assert_eq!(
            outcome,
            BackfillOutcome::Filled {
                date: format_exif_date(created),
                fresh_tag_set: true
            }
        );
        let tags = ExifTagSet::from_path(&path).unwrap().unwrap();
        assert_ne!(tags.text(Tag::DateTime), Some(format_exif_date(later)));
    }

    #[test]
    fn keeps_other_tags_when_filling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edited.jpg");
        write_jpeg(&path, 8, 8);
        write_exif(&path, &tags_with(Tag::Make, TagValue::ascii("Ricoh"))).unwrap();

        let outcome = backfill_file(&path).unwrap();
        assert!(matches!(
            outcome,
            BackfillOutcome::Filled {
                fresh_tag_set: false,
                ..
            }
        ));
        let tags = ExifTagSet::from_path(&path).unwrap().unwrap();
        assert_eq!(tags.text(Tag::Make).as_deref(), Some("Ricoh"));
        assert!(has_date(&tags));
    }

    #[test]
    fn dated_file_is_left_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dated.jpg");
        write_jpeg(&path, 8, 8);
        write_exif(
            &path,
            &tags_with(Tag::DateTimeOriginal, TagValue::ascii("2019:03:04 05:06:07")),
        )
        .unwrap();
        let before = fs::read(&path).unwrap();

        assert_eq!(backfill_file(&path).unwrap(), BackfillOutcome::AlreadyDated);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn unusual_dates_are_left_byte_identical() {
        let dir = TempDir::new().unwrap();
        let dates = [
            (Tag::DateTime, TagValue::ascii("    ")),
            (
                Tag::DateTimeOriginal,
                TagValue::Undefined(b"2019:01:01 00:00:00".to_vec()),
            ),
        ];

        for (i, (tag, value)) in dates.into_iter().enumerate() {
            let path = dir.path().join(format!("odd_{i}.jpg"));
            write_jpeg(&path, 8, 8);
            write_exif(&path, &tags_with(tag, value)).unwrap();
            let before = fs::read(&path).unwrap();

            assert_eq!(backfill_file(&path).unwrap(), BackfillOutcome::AlreadyDated);
            assert_eq!(fs::read(&path).unwrap(), before);
        }
    }

    #[test]
    fn directory_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 8, 8);
        write_jpeg(&dir.path().join("b.JPEG"), 8, 8);
        fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        write_jpeg(&sub.join("c.jpg"), 8, 8);

        let first = backfill_directory(dir.path()).unwrap();
        assert_eq!(first, Tally { processed: 2, skipped: 0, errors: 0 });

        let second = backfill_directory(dir.path()).unwrap();
        assert_eq!(second, Tally { processed: 0, skipped: 2, errors: 0 });

        assert!(ExifTagSet::from_path(sub.join("c.jpg")).unwrap().is_none());
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut bmp = b"BM".to_vec();
        bmp.resize(64, 0);
        fs::write(dir.path().join("a.bmp"), bmp).unwrap();
        write_jpeg(&dir.path().join("b.jpg"), 8, 8);

        let tally = backfill_directory(dir.path()).unwrap();
        assert_eq!(tally, Tally { processed: 1, skipped: 0, errors: 1 });
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(backfill_directory(Path::new("/nonexistent/photos")).is_err());
    }
}
