//! Turns raw metadata into tags and titles.
//!
//! Extractors report keywords under many names (IPTC `Keywords`, Windows
//! `XPKeywords`, XMP `dc:subject`, Lightroom's `HierarchicalSubject`...) and in
//! many shapes: a single delimited string, an array, a nested language map.
//! Every candidate field is flattened to its leaf scalars, each leaf is
//! cleaned up, delimited values are split, and the result is deduplicated on a
//! lowercase key. Field order sets first-seen precedence for display casing.

use std::collections::HashSet;

use crate::capabilities::{MetadataRecord, MetadataValue};
use crate::model::TagRecord;

/// Keyword-like fields, in precedence order.
pub const TAG_FIELDS: &[&str] = &[
    "Keywords",
    "XPKeywords",
    "Subject",
    "XPSubject",
    "HierarchicalSubject",
    "Category",
    "Categories",
    "LastKeywordXMP",
    "SupplementalCategories",
    "dc:subject",
    "DublinCoreSubject",
];

/// Title-like fields, in precedence order.
pub const TITLE_FIELDS: &[&str] = &[
    "Title",
    "XPTitle",
    "ObjectName",
    "ImageDescription",
    "Description",
    "Caption",
    "Headline",
    "DocumentName",
];

const TAG_SEPARATORS: &[char] = &[';', ',', '|'];

/// NUL bytes become spaces, whitespace runs collapse, ends are trimmed.
pub fn clean_text(raw: &str) -> String {
    raw.replace('\0', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`clean_text`], then drop values that cannot be tags: empty strings and
/// bare digit runs (sequence numbers, IDs, years).
pub fn normalize_tag_value(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() || cleaned.bytes().all(|b| b.is_ascii_digit()) {
        None
    } else {
        Some(cleaned)
    }
}

/// Every tag-worthy string reachable from `value`, in document order.
pub fn parse_tag_value(value: &MetadataValue) -> Vec<String> {
    let mut out = Vec::new();
    collect_tag_values(value, &mut out);
    out
}

fn collect_tag_values(value: &MetadataValue, out: &mut Vec<String>) {
    match value {
        MetadataValue::Null => {}
        MetadataValue::List(items) => {
            for item in items {
                collect_tag_values(item, out);
            }
        }
        MetadataValue::Map(entries) => {
            for (_, item) in entries {
                collect_tag_values(item, out);
            }
        }
        leaf => {
            let Some(normalized) = leaf.scalar_string().as_deref().and_then(normalize_tag_value)
            else {
                return;
            };

            if normalized.contains(TAG_SEPARATORS) {
                out.extend(normalized.split(TAG_SEPARATORS).filter_map(normalize_tag_value));
            } else {
                out.push(normalized);
            }
        }
    }
}

/// Deduplicated tags for one image.
pub fn extract_tags(record: &MetadataRecord) -> Vec<TagRecord> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for field in TAG_FIELDS {
        let Some(value) = record.get(field) else {
            continue;
        };
        for raw in parse_tag_value(value) {
            let Some(normalized) = normalize_tag_value(&raw) else {
                continue;
            };
            let tag = TagRecord::from_normalized(&normalized);
            if seen.insert(tag.key.clone()) {
                tags.push(tag);
            }
        }
    }

    tags
}

/// First non-empty cleaned leaf under `value`, depth-first.
pub fn first_text(value: &MetadataValue) -> Option<String> {
    match value {
        MetadataValue::Null => None,
        MetadataValue::List(items) => items.iter().find_map(first_text),
        MetadataValue::Map(entries) => entries.iter().find_map(|(_, item)| first_text(item)),
        leaf => leaf
            .scalar_string()
            .map(|s| clean_text(&s))
            .filter(|s| !s.is_empty()),
    }
}

/// Best display title: the first title-like field with text, else the
/// file-derived `fallback`, else `"Unavailable"`.
pub fn extract_title(record: Option<&MetadataRecord>, fallback: &str) -> String {
    record
        .and_then(|record| {
            TITLE_FIELDS
                .iter()
                .filter_map(|field| record.get(field))
                .find_map(first_text)
        })
        .unwrap_or_else(|| {
            if fallback.is_empty() {
                crate::detail::UNAVAILABLE.to_string()
            } else {
                fallback.to_string()
            }
        })
}
