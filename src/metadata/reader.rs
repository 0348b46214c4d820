use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::tags::ExifTagSet;
use crate::{Error, Result};

impl ExifTagSet {
    /// Reads the EXIF block embedded in an image file.
    ///
    /// Returns `Ok(None)` when the file carries no EXIF block (or the
    /// container is one the codec does not look into). Malformed EXIF and
    /// i/o failures are errors.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(Error::io(path))?;

        match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => {
                let set = Self::from_exif(&exif);
                log::debug!("Read {} EXIF tags from {}", set.len(), path.display());
                Ok(Some(set))
            }
            Err(e) => absent_or(e, path),
        }
    }

    /// Parses a raw EXIF block (TIFF header onwards, no `Exif\0\0` prefix).
    pub fn from_raw(raw: Vec<u8>) -> Result<Option<Self>> {
        match exif::Reader::new().read_raw(raw) {
            Ok(exif) => Ok(Some(Self::from_exif(&exif))),
            Err(
                exif::Error::NotFound(_)
                | exif::Error::NotSupported(_)
                | exif::Error::BlankValue(_),
            ) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn absent_or(e: exif::Error, path: &Path) -> Result<Option<ExifTagSet>> {
    match e {
        exif::Error::NotFound(_) | exif::Error::NotSupported(_) | exif::Error::BlankValue(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            Ok(None)
        }
        // Containers the codec does not understand (BMP, for instance)
        // simply have no EXIF block for us.
        exif::Error::InvalidFormat("Unknown image format") => {
            log::debug!("No EXIF container in {}", path.display());
            Ok(None)
        }
        exif::Error::Io(e) => Err(Error::Io(e, path.into())),
        e => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TagValue, write_exif};
    use crate::test_support::write_jpeg;
    use exif::Tag;
    use tempfile::TempDir;

    #[test]
    fn jpeg_without_exif_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        write_jpeg(&path, 16, 16);

        assert!(ExifTagSet::from_path(&path).unwrap().is_none());
    }

    #[test]
    fn bmp_is_absent_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.bmp");
        let mut bmp = b"BM".to_vec();
        bmp.resize(64, 0);
        std::fs::write(&path, bmp).unwrap();

        assert!(ExifTagSet::from_path(&path).unwrap().is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ExifTagSet::from_path(dir.path().join("nope.jpg")).unwrap_err();
        assert!(matches!(err, Error::Io(..)));
    }

    #[test]
    fn reads_back_written_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tagged.jpg");
        write_jpeg(&path, 16, 16);

        let mut set = ExifTagSet::new();
        set.set(Tag::Make, TagValue::ascii("Fujifilm"));
        set.set(Tag::FNumber, TagValue::Rational(vec![(28, 10)]));
        write_exif(&path, &set).unwrap();

        let read = ExifTagSet::from_path(&path).unwrap().unwrap();
        assert_eq!(read, set);
    }

    #[test]
    fn garbage_raw_block_is_an_error() {
        let raw = b"this is not a tiff header".to_vec();
        assert!(ExifTagSet::from_raw(raw).is_err());
    }
}
