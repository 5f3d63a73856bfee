//! File-name conventions shared by every source strategy: which names count
//! as images, how a display label is derived from a file name, how paths are
//! encoded into addresses, and how labels sort.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const IMAGE_EXTENSIONS: &[&str] = &["avif", "gif", "jpg", "jpeg", "png", "webp"];

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// True when `name` ends in a recognized image extension (case-insensitive).
/// This is the only gate for treating a discovered name or address as an image.
pub fn is_image_file(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// `001_Sunset-over-Bay.jpg` → `001 Sunset over Bay`.
pub fn label_from_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => name,
    };

    let mut label = String::with_capacity(stem.len());
    let mut in_separator = false;
    for c in stem.chars() {
        if c == '-' || c == '_' {
            if !in_separator {
                label.push(' ');
            }
            in_separator = true;
        } else {
            label.push(c);
            in_separator = false;
        }
    }

    let trimmed = label.trim();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Percent-encodes each non-empty `/` segment of `path` and rejoins them.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, COMPONENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of percent-encoding for a single segment; `None` when the decoded
/// bytes are not UTF-8.
pub fn decode_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Gallery ordering: numeric-aware, case-insensitive and blind to accents,
/// so `img2` sorts before `IMG10` and `Émile` sorts among the e's.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    natord::compare_ignore_case(&fold_accents(a), &fold_accents(b))
}

/// Canonical decomposition with the combining marks dropped.
fn fold_accents(label: &str) -> String {
    label.nfd().filter(|c| !is_combining_mark(*c)).collect()
}
