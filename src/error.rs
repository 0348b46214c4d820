use std::path::{Path, PathBuf};

/// Errors produced by the EXIF tools.
///
/// Soft conditions (an image without EXIF, a thumbnail saved without its
/// metadata) are not errors; they surface as `Option`s and outcome variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error {0} at {}", .1.display())]
    Io(std::io::Error, Box<Path>),
    #[error("error from the exif crate: {0}")]
    Exif(#[from] exif::Error),
    #[error("the file at {} contains no exif data", .0.display())]
    NoExifData(PathBuf),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to parse image container: {0}")]
    Container(#[from] img_parts::Error),
    #[error("{0} cannot carry an embedded exif block")]
    UnsupportedContainer(String),
    #[error("source and target are the same file: {}", .0.display())]
    SameFile(PathBuf),
    #[error("failed to back up {}: {0}", .1.display())]
    Backup(std::io::Error, Box<Path>),
    #[error("the exif tag set has no primary image tags to encode")]
    NothingToEncode,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps an i/o error with the path it happened at.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path: Box<Path> = path.as_ref().into();
        move |e| Self::Io(e, path)
    }
}
