use serde::{Deserialize, Serialize};

use crate::detail::DetailFields;
use crate::model::ImageRecord;
use crate::GalleryError;

/// One clickable gallery tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    /// Position in the full collection, not in the filtered subset.
    pub index: usize,
    pub address: String,
    pub label: String,
    pub aria_label: String,
    pub lazy_load: bool,
    pub async_decode: bool,
}

impl TileView {
    pub fn new(index: usize, image: &ImageRecord) -> Self {
        Self {
            index,
            address: image.address.clone(),
            label: image.label.clone(),
            aria_label: format!("Open {}", image.label),
            lazy_load: true,
            async_decode: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChipKind {
    All,
    Tag { key: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipView {
    pub kind: ChipKind,
    pub label: String,
    /// Images carrying the tag; `None` on the "All" chip.
    pub count: Option<usize>,
    pub active: bool,
}

impl ChipView {
    pub fn all(active: bool) -> Self {
        Self {
            kind: ChipKind::All,
            label: "All".into(),
            count: None,
            active,
        }
    }

    pub fn tag(key: impl Into<String>, label: impl Into<String>, count: usize, active: bool) -> Self {
        Self {
            kind: ChipKind::Tag { key: key.into() },
            label: label.into(),
            count: Some(count),
            active,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            ChipKind::All => None,
            ChipKind::Tag { key } => Some(key),
        }
    }
}

/// Trailing marker after the last tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelView {
    pub hidden: bool,
    /// Whether the shell's visibility observer should watch it.
    pub tracked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailPanel {
    pub index: usize,
    pub address: String,
    pub alt: String,
    pub fields: DetailFields,
}

/// Full snapshot of what should be on screen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub status: String,
    pub tiles: Vec<TileView>,
    pub sentinel: SentinelView,
    pub chips: Option<Vec<ChipView>>,
    pub detail: Option<DetailPanel>,
    pub total: usize,
    pub visible: usize,
    /// Set when loading failed; the shell may log or report it.
    pub error: Option<GalleryError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageSource;

    #[test]
    fn tile_carries_accessibility_and_loading_hints() {
        let image = ImageRecord::from(ImageSource::new("images/a.jpg", "beach day"));
        let tile = TileView::new(4, &image);
        assert_eq!(tile.aria_label, "Open beach day");
        assert!(tile.lazy_load && tile.async_decode);
        assert_eq!(tile.index, 4);
    }

    #[test]
    fn all_chip_is_distinct_from_a_tag_named_all() {
        let all = ChipView::all(true);
        let tag = ChipView::tag("all", "All", 3, false);
        assert_ne!(all.kind, tag.kind);
        assert_eq!(all.key(), None);
        assert_eq!(tag.key(), Some("all"));
    }

    #[test]
    fn hidden_chips_serialize_as_null() {
        let json = serde_json::to_value(ViewModel::default()).unwrap();
        assert!(json["chips"].is_null());
        assert!(json["error"].is_null());
        assert_eq!(json["sentinel"]["hidden"], false);
    }
}
