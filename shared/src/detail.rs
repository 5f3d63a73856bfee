//! Detail view: the opened image plus five formatted camera fields.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::{MetadataRecord, MetadataResult, MetadataValue};
use crate::metadata_cache::Lookup;
use crate::model::ImageRecord;
use crate::normalize::extract_title;
use crate::view::DetailPanel;

pub const UNAVAILABLE: &str = "Unavailable";
pub const LOADING: &str = "Loading...";
pub const CAPABILITY_MISSING: &str = "EXIF library missing";

pub const SHUTTER_FIELD: &str = "ExposureTime";
pub const APERTURE_FIELD: &str = "FNumber";
pub const ISO_FIELDS: &[&str] = &["ISO", "PhotographicSensitivity", "ISOSpeedRatings"];
pub const FOCAL_LENGTH_FIELDS: &[&str] =
    &["FocalLength", "FocalLengthIn35mmFormat", "FocalLengthIn35mmFilm"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFields {
    pub title: String,
    pub shutter: String,
    pub aperture: String,
    pub iso: String,
    pub focal_length: String,
}

impl DetailFields {
    fn uniform(text: &str) -> Self {
        Self {
            title: text.to_string(),
            shutter: text.to_string(),
            aperture: text.to_string(),
            iso: text.to_string(),
            focal_length: text.to_string(),
        }
    }

    pub fn loading() -> Self {
        Self::uniform(LOADING)
    }

    pub fn unavailable() -> Self {
        Self::uniform(UNAVAILABLE)
    }

    /// No extractor: the title still shows the image label when there is one.
    pub fn capability_missing(label: &str) -> Self {
        let mut fields = Self::uniform(CAPABILITY_MISSING);
        if !label.is_empty() {
            fields.title = label.to_string();
        }
        fields
    }

    pub fn from_metadata(record: &MetadataRecord, label: &str) -> Self {
        Self {
            title: extract_title(Some(record), label),
            shutter: format_shutter(record.get(SHUTTER_FIELD)),
            aperture: format_aperture(record.get(APERTURE_FIELD)),
            iso: format_iso(record.first_present(ISO_FIELDS)),
            focal_length: format_focal_length(record.first_present(FOCAL_LENGTH_FIELDS)),
        }
    }
}

enum Reading {
    Missing,
    Number(f64),
    Raw(String),
}

fn read(value: Option<&MetadataValue>) -> Reading {
    match value {
        None | Some(MetadataValue::Null | MetadataValue::Map(_)) => Reading::Missing,
        Some(MetadataValue::List(items)) => read(items.first()),
        Some(MetadataValue::Number(n)) => Reading::Number(*n),
        Some(MetadataValue::Bool(b)) => Reading::Raw(b.to_string()),
        Some(MetadataValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Reading::Missing
            } else {
                trimmed
                    .parse::<f64>()
                    .map_or_else(|_| Reading::Raw(s.clone()), Reading::Number)
            }
        }
    }
}

/// Common shape of every formatter: missing and non-positive numbers are
/// unavailable, unparsable text passes through, usable numbers go to `fmt`.
fn format_with(value: Option<&MetadataValue>, fmt: impl FnOnce(f64) -> String) -> String {
    match read(value) {
        Reading::Missing => UNAVAILABLE.to_string(),
        Reading::Raw(text) => text,
        Reading::Number(n) if !n.is_finite() || n <= 0.0 => UNAVAILABLE.to_string(),
        Reading::Number(n) => fmt(n),
    }
}

/// Fixed-point rendering with exact ties rounded up, as `toFixed` does.
/// `format!` alone would send `4.25` to `4.2`.
fn to_fixed(n: f64, digits: usize) -> String {
    const GUARD: usize = 30;
    let exact = format!("{:.*}", digits + GUARD, n);
    let (kept, rest) = exact.split_at(exact.len() - GUARD);
    let kept = kept.trim_end_matches('.');
    if rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0') {
        increment_last_digit(kept)
    } else {
        format!("{:.*}", digits, n)
    }
}

fn increment_last_digit(number: &str) -> String {
    let mut bytes: Vec<u8> = number.bytes().collect();
    let mut i = bytes.len();
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b'.' => continue,
            b'9' => bytes[i] = b'0',
            digit => {
                bytes[i] = digit + 1;
                return bytes.into_iter().map(char::from).collect();
            }
        }
    }
    std::iter::once('1').chain(bytes.into_iter().map(char::from)).collect()
}

fn whole_or_one_decimal(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        to_fixed(n, 1)
    }
}

pub fn format_shutter(value: Option<&MetadataValue>) -> String {
    format_with(value, |n| {
        if n >= 1.0 {
            return format!("{}s", whole_or_one_decimal(n));
        }
        let reciprocal = (1.0 / n).round();
        if reciprocal > 1.0 {
            format!("1/{reciprocal:.0}s")
        } else {
            format!("{}s", to_fixed(n, 3))
        }
    })
}

pub fn format_aperture(value: Option<&MetadataValue>) -> String {
    format_with(value, |n| format!("f/{}", whole_or_one_decimal(n)))
}

pub fn format_iso(value: Option<&MetadataValue>) -> String {
    format_with(value, |n| format!("{:.0}", n.round()))
}

pub fn format_focal_length(value: Option<&MetadataValue>) -> String {
    format_with(value, |n| format!("{}mm", whole_or_one_decimal(n)))
}

/// The open detail panel, if any, and the address whose metadata it still
/// waits for. A result for any other address never lands on the panel, so a
/// slow lookup for a previously opened image cannot overwrite the one on
/// screen; it still settles the metadata cache.
#[derive(Debug, Default)]
pub struct DetailView {
    panel: Option<DetailPanel>,
    awaiting: Option<String>,
}

impl DetailView {
    pub fn panel(&self) -> Option<&DetailPanel> {
        self.panel.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.panel.is_some()
    }

    pub fn awaiting(&self) -> Option<&str> {
        self.awaiting.as_deref()
    }

    /// Shows `image` right away, with fields as final as `lookup` allows.
    pub fn open(&mut self, index: usize, image: &ImageRecord, lookup: &Lookup) -> &DetailPanel {
        let (fields, awaiting) = match lookup {
            Lookup::Ready(record) => (DetailFields::from_metadata(record, &image.label), None),
            Lookup::Fetch | Lookup::InFlight => {
                (DetailFields::loading(), Some(image.address.clone()))
            }
            Lookup::Unavailable => {
                warn!("metadata extractor unavailable; check that it loaded");
                (DetailFields::capability_missing(&image.label), None)
            }
        };
        self.awaiting = awaiting;
        self.panel.insert(DetailPanel {
            index,
            address: image.address.clone(),
            alt: image.label.clone(),
            fields,
        })
    }

    /// Lands the lookup for `address`. Returns whether the panel changed.
    pub fn settle(&mut self, address: &str, result: &MetadataResult) -> bool {
        if self.awaiting.as_deref() != Some(address) {
            debug!(address, "dropping metadata for an image that is no longer open");
            return false;
        }
        let Some(panel) = self.panel.as_mut() else {
            return false;
        };
        self.awaiting = None;
        panel.fields = match result {
            Ok(record) => DetailFields::from_metadata(record, &panel.alt),
            Err(e) => {
                warn!(address, error = %e, "failed to read metadata for detail view");
                DetailFields::unavailable()
            }
        };
        true
    }

    /// Returns whether anything was open.
    pub fn close(&mut self) -> bool {
        self.awaiting = None;
        self.panel.take().is_some()
    }
}
