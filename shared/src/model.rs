use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What a source strategy yields: where the image lives and what to call it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub address: String,
    pub label: String,
}

impl ImageSource {
    pub fn new(address: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: label.into(),
        }
    }
}

/// A normalized keyword. `key` is the identity, `label` the first casing seen.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRecord {
    pub key: String,
    pub label: String,
}

impl TagRecord {
    /// Builds a tag from an already-normalized value.
    pub fn from_normalized(value: &str) -> Self {
        Self {
            key: value.to_lowercase(),
            label: value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub address: String,
    pub label: String,
    pub tags: Vec<TagRecord>,
    pub tag_keys: BTreeSet<String>,
}

impl ImageRecord {
    pub fn set_tags(&mut self, tags: Vec<TagRecord>) {
        self.tag_keys = tags.iter().map(|tag| tag.key.clone()).collect();
        self.tags = tags;
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
        self.tag_keys.clear();
    }

    /// OR semantics: any selected key is enough.
    pub fn matches_any(&self, selection: &BTreeSet<String>) -> bool {
        !self.tag_keys.is_disjoint(selection)
    }
}

impl From<ImageSource> for ImageRecord {
    fn from(source: ImageSource) -> Self {
        Self {
            address: source.address,
            label: source.label,
            tags: Vec::new(),
            tag_keys: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTag {
    pub key: String,
    pub label: String,
    pub count: usize,
}

/// Which strategy supplied the image list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadSource {
    Repository,
    DirectoryListing,
    Manifest,
}

impl LoadSource {
    pub const fn name(self) -> &'static str {
        match self {
            LoadSource::Repository => "repository",
            LoadSource::DirectoryListing => "directory",
            LoadSource::Manifest => "manifest",
        }
    }

    /// Annotation for the status line; the primary source has none.
    pub const fn label(self) -> Option<&'static str> {
        match self {
            LoadSource::Repository => None,
            LoadSource::DirectoryListing => Some("directory fallback"),
            LoadSource::Manifest => Some("manifest fallback"),
        }
    }
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
