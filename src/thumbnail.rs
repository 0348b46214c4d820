//! Size-capped JPEG thumbnails that keep the source's EXIF.
//!
//! A source `<root>/a/b.png` maps to `<root>/<output_dir>/a/b.jpg`. A
//! thumbnail whose mtime is not older than its source is left alone, so
//! re-running over an unchanged tree does no work.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ThumbnailConfig;
use crate::metadata::{ExifTagSet, embed_exif, encode_exif};
use crate::pipeline::{THUMBNAIL_SOURCE_EXTENSIONS, Tally, walk_images};
use crate::{Error, Result};

/// Size cap, quality and output location for a thumbnail run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSettings {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1–100.
    pub quality: u8,
    /// Output directory, relative to the scanned root.
    pub output_dir: PathBuf,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self::from(&ThumbnailConfig::default())
    }
}

impl From<&ThumbnailConfig> for ThumbnailSettings {
    fn from(config: &ThumbnailConfig) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            quality: config.quality,
            output_dir: PathBuf::from(&config.output_dir),
        }
    }
}

/// What happened to the source's EXIF when a thumbnail was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "exif", rename_all = "snake_case")]
pub enum ExifCarryOver {
    Embedded,
    /// The source has no EXIF block.
    NotPresent,
    /// The source EXIF could not be decoded or re-encoded; the thumbnail was
    /// saved without it.
    Dropped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// The existing thumbnail is at least as new as its source.
    UpToDate,
    Generated {
        width: u32,
        height: u32,
        exif: ExifCarryOver,
    },
}

/// Where the thumbnail of `source` goes, or `None` if `source` is not
/// under `root`.
pub fn thumbnail_path(root: &Path, output_root: &Path, source: &Path) -> Option<PathBuf> {
    let relative = source.strip_prefix(root).ok()?;
    Some(output_root.join(relative).with_extension("jpg"))
}

/// An existing thumbnail with mtime ≥ the source's needs no regeneration.
pub fn is_up_to_date(source: &Path, thumbnail: &Path) -> bool {
    let mtime = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (mtime(source), mtime(thumbnail)) {
        (Some(src), Some(dst)) => dst >= src,
        _ => false,
    }
}

/// Shrink `(width, height)` to fit inside `(max_width, max_height)`,
/// keeping the aspect ratio. Images already inside the box are not scaled up.
///
/// ```rust
/// use exif_kit::thumbnail::fit_within;
///
/// assert_eq!(fit_within(2000, 1000, 720, 720), (720, 360));
/// assert_eq!(fit_within(400, 300, 720, 720), (400, 300));
/// ```
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let (max_w, max_h) = (u64::from(max_width), u64::from(max_height));
    // Compare w/h against max_w/max_h without floating point.
    let (new_w, new_h) = if w * max_h >= h * max_w {
        (max_w, (h * max_w + w / 2) / w)
    } else {
        ((w * max_h + h / 2) / h, max_h)
    };

    (new_w.max(1) as u32, new_h.max(1) as u32)
}

/// Convert to 8-bit RGB. Transparent pixels are composited onto white.
pub fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| {
            let (c, a) = (u32::from(c), u32::from(a));
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Flatten and shrink a decoded image into a thumbnail bitmap.
pub fn render_thumbnail(img: DynamicImage, max_width: u32, max_height: u32) -> RgbImage {
    let rgb = flatten_to_rgb(img);
    let (width, height) = fit_within(rgb.width(), rgb.height(), max_width, max_height);
    if (width, height) == rgb.dimensions() {
        return rgb;
    }
    image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
}

pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(rgb)?;
    Ok(out)
}

fn decode(source: &Path) -> Result<DynamicImage> {
    let mut reader = ImageReader::open(source)
        .map_err(Error::io(source))?
        .with_guessed_format()
        .map_err(Error::io(source))?;
    reader.no_limits();
    Ok(reader.decode()?)
}

/// Embed the EXIF of `source` into `jpeg`. Never fails: problems with the
/// metadata only downgrade the outcome.
fn attach_exif(source: &Path, jpeg: Vec<u8>) -> (Vec<u8>, ExifCarryOver) {
    let tags = match ExifTagSet::from_path(source) {
        Ok(Some(tags)) if !tags.is_empty() => tags,
        Ok(_) => return (jpeg, ExifCarryOver::NotPresent),
        Err(e) => {
            let reason = e.to_string();
            return (jpeg, ExifCarryOver::Dropped { reason });
        }
    };

    match encode_exif(&tags).and_then(|raw| embed_exif(jpeg.clone(), Some(raw))) {
        Ok(with_exif) => (with_exif, ExifCarryOver::Embedded),
        Err(e) => (jpeg, ExifCarryOver::Dropped { reason: e.to_string() }),
    }
}

/// Write the thumbnail of `source` to `destination` unless it is up to date.
pub fn generate_thumbnail(
    source: &Path,
    destination: &Path,
    settings: &ThumbnailSettings,
) -> Result<ThumbnailOutcome> {
    if is_up_to_date(source, destination) {
        return Ok(ThumbnailOutcome::UpToDate);
    }

    let img = decode(source)?;
    log::debug!("Decoded {} ({}x{})", source.display(), img.width(), img.height());

    let thumb = render_thumbnail(img, settings.max_width, settings.max_height);
    let jpeg = encode_jpeg(&thumb, settings.quality)?;
    let (jpeg, exif) = attach_exif(source, jpeg);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(Error::io(parent))?;
    }
    fs::write(destination, jpeg).map_err(Error::io(destination))?;

    Ok(ThumbnailOutcome::Generated {
        width: thumb.width(),
        height: thumb.height(),
        exif,
    })
}

/// Thumbnail every recognized image under `root`.
///
/// The output subtree itself is not scanned. Per-file failures are logged
/// and counted.
pub fn generate_all(root: &Path, settings: &ThumbnailSettings) -> Tally {
    let output_root = root.join(&settings.output_dir);
    let mut tally = Tally::default();

    for source in walk_images(root, &output_root, THUMBNAIL_SOURCE_EXTENSIONS) {
        let Some(destination) = thumbnail_path(root, &output_root, &source) else {
            continue;
        };
        let name = source.strip_prefix(root).unwrap_or(&source).display();

        match generate_thumbnail(&source, &destination, settings) {
            Ok(ThumbnailOutcome::UpToDate) => {
                log::debug!("Up to date: {name}");
                tally.skipped += 1;
            }
            Ok(ThumbnailOutcome::Generated {
                width,
                height,
                exif,
            }) => {
                log::info!("Generated: {name} ({width}x{height})");
                if let ExifCarryOver::Dropped { reason } = &exif {
                    log::warn!("  EXIF not carried over: {reason}");
                }
                tally.processed += 1;
            }
            Err(e) => {
                log::error!("Error {name}: {e}");
                tally.errors += 1;
            }
        }
    }

    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TagValue, write_exif};
    use crate::test_support::write_jpeg;
    use exif::Tag;
    use image::{ColorType, LumaA, Rgba, RgbaImage};
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn settings() -> ThumbnailSettings {
        ThumbnailSettings::default()
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_within(2000, 1000, 720, 720), (720, 360));
        assert_eq!(fit_within(1000, 2000, 720, 720), (360, 720));
        assert_eq!(fit_within(400, 300, 720, 720), (400, 300));
        assert_eq!(fit_within(720, 720, 720, 720), (720, 720));
        assert_eq!(fit_within(3000, 2, 720, 720), (720, 1));
        assert_eq!(fit_within(1920, 1080, 1280, 720), (1280, 720));
    }

    #[test]
    fn alpha_is_composited_on_white() {
        let mut rgba = RgbaImage::new(3, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([200, 10, 10, 255]));
        rgba.put_pixel(2, 0, Rgba([0, 0, 0, 128]));

        let rgb = flatten_to_rgb(DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 10, 10]));
        assert_eq!(rgb.get_pixel(2, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn grey_with_alpha_becomes_rgb() {
        let img = image::ImageBuffer::from_pixel(1000, 500, LumaA([40u8, 0]));
        let thumb = render_thumbnail(DynamicImage::ImageLumaA8(img), 720, 720);
        assert_eq!(thumb.dimensions(), (720, 360));
        assert_eq!(thumb.get_pixel(10, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn thumbnail_paths_mirror_the_tree() {
        let root = Path::new("/photos");
        let out = root.join("thumbnails");
        assert_eq!(
            thumbnail_path(root, &out, Path::new("/photos/2024/trip/IMG_1.PNG")),
            Some(PathBuf::from("/photos/thumbnails/2024/trip/IMG_1.jpg"))
        );
        assert_eq!(thumbnail_path(root, &out, Path::new("/elsewhere/a.jpg")), None);
    }

    #[test]
    fn transparent_png_becomes_rgb_jpeg() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("logo.png");
        let dst = dir.path().join("out/logo.jpg");
        RgbaImage::from_pixel(2000, 1000, Rgba([0, 0, 255, 0]))
            .save(&src)
            .unwrap();

        let outcome = generate_thumbnail(&src, &dst, &settings()).unwrap();
        assert_eq!(
            outcome,
            ThumbnailOutcome::Generated {
                width: 720,
                height: 360,
                exif: ExifCarryOver::NotPresent
            }
        );

        let thumb = image::open(&dst).unwrap();
        assert_eq!(thumb.color(), ColorType::Rgb8);
        assert_eq!((thumb.width(), thumb.height()), (720, 360));
    }

    #[test]
    fn source_exif_is_embedded() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("photo.jpg");
        let dst = dir.path().join("thumbs/photo.jpg");
        write_jpeg(&src, 1600, 1200);
        let mut tags = ExifTagSet::new();
        tags.set(Tag::Make, TagValue::ascii("Olympus"));
        tags.set(Tag::DateTimeOriginal, TagValue::ascii("2018:07:01 12:00:00"));
        write_exif(&src, &tags).unwrap();

        let outcome = generate_thumbnail(&src, &dst, &settings()).unwrap();
        assert_eq!(
            outcome,
            ThumbnailOutcome::Generated {
                width: 720,
                height: 540,
                exif: ExifCarryOver::Embedded
            }
        );
        assert_eq!(ExifTagSet::from_path(&dst).unwrap().unwrap(), tags);
    }

    #[test]
    fn second_run_skips_everything() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("2023");
        fs::create_dir(&nested).unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 100, 80);
        RgbaImage::new(50, 50).save(nested.join("b.png")).unwrap();
        fs::write(dir.path().join("readme.md"), b"# photos").unwrap();

        let first = generate_all(dir.path(), &settings());
        assert_eq!(first, Tally { processed: 2, skipped: 0, errors: 0 });
        assert!(dir.path().join("thumbnails/a.jpg").is_file());
        assert!(dir.path().join("thumbnails/2023/b.jpg").is_file());

        let second = generate_all(dir.path(), &settings());
        assert_eq!(second, Tally { processed: 0, skipped: 2, errors: 0 });
    }

    #[test]
    fn touched_source_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.jpg");
        write_jpeg(&src, 100, 80);
        generate_all(dir.path(), &settings());

        let later = SystemTime::now() + Duration::from_secs(3600);
        File::options().write(true).open(&src).unwrap().set_modified(later).unwrap();

        let tally = generate_all(dir.path(), &settings());
        assert_eq!(tally, Tally { processed: 1, skipped: 0, errors: 0 });
    }

    #[test]
    fn undecodable_files_are_counted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("phone.heic"), b"\0\0\0\x18ftypheic").unwrap();
        fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();
        write_jpeg(&dir.path().join("ok.jpg"), 10, 10);

        let tally = generate_all(dir.path(), &settings());
        assert_eq!(tally, Tally { processed: 1, skipped: 0, errors: 2 });
        assert!(!dir.path().join("thumbnails/phone.jpg").exists());
    }

    #[test]
    fn truncated_source_never_leaves_a_broken_thumbnail() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("partial.jpg");
        let dst = dir.path().join("thumbs/partial.jpg");
        let full = crate::test_support::jpeg_bytes(64, 64);
        fs::write(&src, &full[..full.len() * 2 / 3]).unwrap();

        match generate_thumbnail(&src, &dst, &settings()) {
            Ok(ThumbnailOutcome::Generated { width, height, .. }) => {
                let thumb = image::open(&dst).unwrap();
                assert_eq!((thumb.width(), thumb.height()), (width, height));
            }
            Ok(ThumbnailOutcome::UpToDate) => panic!("nothing to be up to date with"),
            Err(_) => assert!(!dst.exists()),
        }
    }

    #[test]
    fn custom_output_dir_and_size() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("wide.jpg"), 400, 100);
        let settings = ThumbnailSettings {
            max_width: 200,
            max_height: 200,
            quality: 60,
            output_dir: PathBuf::from("small"),
        };

        generate_all(dir.path(), &settings);
        let thumb = image::open(dir.path().join("small/wide.jpg")).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 50));
    }
}
