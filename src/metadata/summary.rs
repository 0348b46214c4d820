use exif::Tag;
use serde::Serialize;
use std::fmt;

use super::tags::{ExifTagSet, Section, TagValue};

/// The handful of fields shown after a metadata copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExifSummary {
    pub make: Option<String>,
    pub model: Option<String>,
    pub date_time: Option<String>,
    pub date_time_original: Option<String>,
    /// Exposure time as written, e.g. `1/125s`.
    pub exposure_time: Option<String>,
    /// Aperture, e.g. `f/5.6`.
    pub f_number: Option<String>,
    pub has_gps: bool,
    pub tag_count: usize,
}

impl ExifSummary {
    pub fn from_tags(set: &ExifTagSet) -> Self {
        let exposure_time = set
            .get(Tag::ExposureTime)
            .and_then(TagValue::as_rational)
            .map(|(num, denom)| format!("{num}/{denom}s"));

        let f_number = set
            .get(Tag::FNumber)
            .and_then(TagValue::as_rational)
            .filter(|&(_, denom)| denom != 0)
            .map(|(num, denom)| format!("f/{:.1}", num as f64 / denom as f64));

        Self {
            make: non_empty(set.text(Tag::Make)),
            model: non_empty(set.text(Tag::Model)),
            date_time: non_empty(set.text(Tag::DateTime)),
            date_time_original: non_empty(set.text(Tag::DateTimeOriginal)),
            exposure_time,
            f_number,
            has_gps: !set.section(Section::Gps).is_empty(),
            tag_count: set.len(),
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl fmt::Display for ExifSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Make", &self.make),
            ("Model", &self.model),
            ("DateTime", &self.date_time),
            ("DateTimeOriginal", &self.date_time_original),
            ("ExposureTime", &self.exposure_time),
            ("FNumber", &self.f_number),
        ];
        for (tag, value) in rows {
            if let Some(value) = value {
                writeln!(f, "  {tag:<18} : {value}")?;
            }
        }
        if self.has_gps {
            writeln!(f, "  {:<18} : present", "GPS")?;
        }
        write!(f, "  {:<18} : {}", "Total tags", self.tag_count)
    }
}
