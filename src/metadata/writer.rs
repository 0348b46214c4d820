use exif::In;
use exif::experimental::Writer;
use img_parts::{Bytes, DynImage, ImageEXIF};
use std::io::Cursor;
use std::path::Path;

use super::tags::ExifTagSet;
use crate::pipeline::ImageKind;
use crate::{Error, Result};

/// Serializes a tag set into a raw EXIF block (big-endian TIFF structure,
/// no `Exif\0\0` prefix).
///
/// Pointer and offset tags are synthesized by the encoder. The embedded
/// thumbnail JPEG, if any, is written into the 1st IFD.
pub fn encode_exif(set: &ExifTagSet) -> Result<Vec<u8>> {
    let fields = set.to_fields();
    if !fields.iter().any(|f| f.ifd_num == In::PRIMARY) {
        return Err(Error::NothingToEncode);
    }

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    if let Some(jpeg) = set.thumbnail_jpeg() {
        writer.set_jpeg(jpeg, In::THUMBNAIL);
    }

    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false)?;
    let raw = buf.into_inner();
    log::debug!("Encoded {} EXIF tags into {} bytes", set.len(), raw.len());
    Ok(raw)
}

/// Replaces (or removes, with `None`) the EXIF block of an in-memory JPEG,
/// PNG or WebP image. Every other segment/chunk is kept as is.
pub fn embed_exif(container: Vec<u8>, raw_exif: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let mut image = DynImage::from_bytes(Bytes::from(container))?
        .ok_or_else(|| Error::UnsupportedContainer("this image format".to_string()))?;
    image.set_exif(raw_exif.map(Bytes::from));
    Ok(image.encoder().bytes().to_vec())
}

/// Overwrites the EXIF block of the image at `path` with `set`.
///
/// Pixel data is not re-encoded; only the metadata segment changes.
pub fn write_exif(path: &Path, set: &ExifTagSet) -> Result<()> {
    let raw = encode_exif(set)?;
    write_raw_exif(path, raw)
}

/// Splices an already encoded EXIF block into the image at `path`.
pub fn write_raw_exif(path: &Path, raw_exif: Vec<u8>) -> Result<()> {
    if !ImageKind::from_path(path).is_some_and(ImageKind::can_carry_exif) {
        return Err(Error::UnsupportedContainer(path.display().to_string()));
    }

    let bytes = std::fs::read(path).map_err(Error::io(path))?;
    let output = embed_exif(bytes, Some(raw_exif))?;
    std::fs::write(path, output).map_err(Error::io(path))?;
    log::debug!("EXIF block written to {}", path.display());
    Ok(())
}
