use exif::{Context, Field, In, Rational, SRational, Tag, Value};
use std::collections::BTreeMap;

/// Tags describing the layout of the TIFF structure itself.
///
/// They are never stored in an [`ExifTagSet`]; the encoder synthesizes them.
const STRUCTURAL_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// A named group of EXIF tags (an IFD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// 0th IFD — primary image attributes (make, model, date, ...).
    PrimaryImage,
    /// Exif IFD — capture attributes (exposure, aperture, original date, ...).
    Capture,
    /// GPS IFD — location attributes.
    Gps,
    /// Interoperability IFD.
    Interop,
    /// 1st IFD — attributes of the embedded preview thumbnail.
    EmbeddedThumbnail,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::PrimaryImage,
        Section::Capture,
        Section::Gps,
        Section::Interop,
        Section::EmbeddedThumbnail,
    ];

    /// Conventional short name of the section.
    pub fn name(self) -> &'static str {
        match self {
            Section::PrimaryImage => "0th",
            Section::Capture => "Exif",
            Section::Gps => "GPS",
            Section::Interop => "Interop",
            Section::EmbeddedThumbnail => "1st",
        }
    }

    /// The section a tag belongs to when it appears in the given IFD.
    ///
    /// Only TIFF-context tags are kept for the embedded thumbnail.
    pub fn locate(tag: Tag, ifd_num: In) -> Option<Section> {
        if ifd_num == In::PRIMARY {
            match tag.context() {
                Context::Tiff => Some(Section::PrimaryImage),
                Context::Exif => Some(Section::Capture),
                Context::Gps => Some(Section::Gps),
                Context::Interop => Some(Section::Interop),
                #[allow(unreachable_patterns)]
                _ => None,
            }
        } else if ifd_num == In::THUMBNAIL && tag.context() == Context::Tiff {
            Some(Section::EmbeddedThumbnail)
        } else {
            None
        }
    }

    fn context(self) -> Context {
        match self {
            Section::PrimaryImage | Section::EmbeddedThumbnail => Context::Tiff,
            Section::Capture => Context::Exif,
            Section::Gps => Context::Gps,
            Section::Interop => Context::Interop,
        }
    }

    fn ifd_num(self) -> In {
        match self {
            Section::EmbeddedThumbnail => In::THUMBNAIL,
            _ => In::PRIMARY,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The value of a single EXIF tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    /// One or more ASCII strings, without the trailing NUL.
    Ascii(Vec<Vec<u8>>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    /// Unsigned rationals as `(numerator, denominator)`.
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    /// Signed rationals as `(numerator, denominator)`.
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    /// A single ASCII string value.
    pub fn ascii(s: &str) -> Self {
        Self::Ascii(vec![s.as_bytes().to_vec()])
    }

    /// The first ASCII component, lossily decoded.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Ascii(parts) => parts
                .first()
                .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').to_string()),
            _ => None,
        }
    }

    /// Whether the value carries no data. An ASCII value made only of NUL
    /// bytes counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Ascii(parts) => parts.iter().all(|p| p.iter().all(|&b| b == 0)),
            Self::Byte(v) | Self::Undefined(v) => v.is_empty(),
            Self::Short(v) => v.is_empty(),
            Self::Long(v) => v.is_empty(),
            Self::Rational(v) => v.is_empty(),
            Self::SByte(v) => v.is_empty(),
            Self::SShort(v) => v.is_empty(),
            Self::SLong(v) => v.is_empty(),
            Self::SRational(v) => v.is_empty(),
            Self::Float(v) => v.is_empty(),
            Self::Double(v) => v.is_empty(),
        }
    }

    /// The first unsigned rational.
    pub fn as_rational(&self) -> Option<(u32, u32)> {
        match self {
            Self::Rational(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Converts a codec value. Values of unknown type yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let converted = match value {
            Value::Byte(v) => Self::Byte(v.clone()),
            Value::Ascii(v) => Self::Ascii(v.clone()),
            Value::Short(v) => Self::Short(v.clone()),
            Value::Long(v) => Self::Long(v.clone()),
            Value::Rational(v) => Self::Rational(v.iter().map(|r| (r.num, r.denom)).collect()),
            Value::SByte(v) => Self::SByte(v.clone()),
            Value::Undefined(v, _) => Self::Undefined(v.clone()),
            Value::SShort(v) => Self::SShort(v.clone()),
            Value::SLong(v) => Self::SLong(v.clone()),
            Value::SRational(v) => Self::SRational(v.iter().map(|r| (r.num, r.denom)).collect()),
            Value::Float(v) => Self::Float(v.clone()),
            Value::Double(v) => Self::Double(v.clone()),
            #[allow(unreachable_patterns)]
            _ => return None,
        };
        Some(converted)
    }

    /// Converts back into a codec value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Byte(v) => Value::Byte(v.clone()),
            Self::Ascii(v) => Value::Ascii(v.clone()),
            Self::Short(v) => Value::Short(v.clone()),
            Self::Long(v) => Value::Long(v.clone()),
            Self::Rational(v) => Value::Rational(
                v.iter()
                    .map(|&(num, denom)| Rational { num, denom })
                    .collect(),
            ),
            Self::SByte(v) => Value::SByte(v.clone()),
            Self::Undefined(v) => Value::Undefined(v.clone(), 0),
            Self::SShort(v) => Value::SShort(v.clone()),
            Self::SLong(v) => Value::SLong(v.clone()),
            Self::SRational(v) => Value::SRational(
                v.iter()
                    .map(|&(num, denom)| SRational { num, denom })
                    .collect(),
            ),
            Self::Float(v) => Value::Float(v.clone()),
            Self::Double(v) => Value::Double(v.clone()),
        }
    }
}

/// A decoded EXIF block, split into its sections.
///
/// A fresh (`Default`) set has every section present and empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifTagSet {
    sections: [BTreeMap<u16, TagValue>; 5],
    thumbnail_jpeg: Option<Vec<u8>>,
}

impl ExifTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tag set from parsed codec output.
    pub fn from_exif(exif: &exif::Exif) -> Self {
        Self::from_fields(exif.fields(), exif.buf())
    }

    /// Builds a tag set from codec fields. `buf` is the raw TIFF data the
    /// fields were parsed from; it is needed to lift out the thumbnail JPEG.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a Field>, buf: &[u8]) -> Self {
        let mut set = Self::default();
        let mut jpeg_offset = None;
        let mut jpeg_length = None;

        for field in fields {
            if field.ifd_num == In::THUMBNAIL {
                if field.tag == Tag::JPEGInterchangeFormat {
                    jpeg_offset = field.value.get_uint(0);
                } else if field.tag == Tag::JPEGInterchangeFormatLength {
                    jpeg_length = field.value.get_uint(0);
                }
            }
            if STRUCTURAL_TAGS.contains(&field.tag) {
                continue;
            }
            let Some(section) = Section::locate(field.tag, field.ifd_num) else {
                log::debug!("Dropping {} from IFD {}", field.tag, field.ifd_num);
                continue;
            };
            let Some(value) = TagValue::from_value(&field.value) else {
                log::debug!("Dropping {} with a value of unknown type", field.tag);
                continue;
            };
            set.sections[section.index()].insert(field.tag.number(), value);
        }

        if let (Some(offset), Some(length)) = (jpeg_offset, jpeg_length) {
            let start = offset as usize;
            match start
                .checked_add(length as usize)
                .and_then(|end| buf.get(start..end))
            {
                Some(jpeg) => set.thumbnail_jpeg = Some(jpeg.to_vec()),
                None => log::debug!("Embedded thumbnail points outside the EXIF block"),
            }
        }

        set
    }

    /// Codec fields for every stored tag, ready for encoding.
    pub fn to_fields(&self) -> Vec<Field> {
        Section::ALL
            .iter()
            .flat_map(|&section| {
                self.sections[section.index()]
                    .iter()
                    .map(move |(&number, value)| Field {
                        tag: Tag(section.context(), number),
                        ifd_num: section.ifd_num(),
                        value: value.to_value(),
                    })
            })
            .collect()
    }

    pub fn section(&self, section: Section) -> &BTreeMap<u16, TagValue> {
        &self.sections[section.index()]
    }

    /// Looks a tag up in the primary image's IFDs.
    pub fn get(&self, tag: Tag) -> Option<&TagValue> {
        let section = Section::locate(tag, In::PRIMARY)?;
        self.sections[section.index()].get(&tag.number())
    }

    /// First ASCII component of a primary-image tag.
    pub fn text(&self, tag: Tag) -> Option<String> {
        self.get(tag).and_then(TagValue::as_text)
    }

    /// Sets a tag of the primary image; the section follows from the tag.
    pub fn set(&mut self, tag: Tag, value: TagValue) {
        match Section::locate(tag, In::PRIMARY) {
            Some(section) => {
                self.sections[section.index()].insert(tag.number(), value);
            }
            None => log::debug!("Ignoring {tag}: no section for its context"),
        }
    }

    /// Sets a TIFF tag of the embedded thumbnail.
    pub fn set_thumbnail_tag(&mut self, tag: Tag, value: TagValue) {
        if tag.context() == Context::Tiff {
            self.sections[Section::EmbeddedThumbnail.index()].insert(tag.number(), value);
        } else {
            log::debug!("Ignoring {tag}: thumbnail IFD keeps TIFF tags only");
        }
    }

    pub fn thumbnail_jpeg(&self) -> Option<&[u8]> {
        self.thumbnail_jpeg.as_deref()
    }

    pub fn set_thumbnail_jpeg(&mut self, jpeg: Option<Vec<u8>>) {
        self.thumbnail_jpeg = jpeg;
    }

    /// Total number of tags across all sections.
    pub fn len(&self) -> usize {
        self.sections.iter().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.thumbnail_jpeg.is_none()
    }
}
