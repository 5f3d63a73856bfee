use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::model::{AvailableTag, ImageRecord, ImageSource, LoadSource, TagRecord};
use crate::naming::compare_labels;
use crate::view::ChipView;

fn photos(count: usize) -> &'static str {
    if count == 1 {
        "photo"
    } else {
        "photos"
    }
}

/// The loaded collection and the tag filter over it.
///
/// Image order is fixed at load time. Filtering only ever derives a subset;
/// it never reorders.
#[derive(Debug, Default, Clone)]
pub struct GalleryState {
    images: Vec<ImageRecord>,
    selection: BTreeSet<String>,
    available_tags: Vec<AvailableTag>,
    load_source: Option<LoadSource>,
}

impl GalleryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly resolved, already sorted list. Tags, available
    /// tags and the selection all start empty.
    pub fn replace_images(&mut self, source: LoadSource, images: Vec<ImageSource>) {
        self.images = images.into_iter().map(ImageRecord::from).collect();
        self.selection.clear();
        self.available_tags.clear();
        self.load_source = Some(source);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&ImageRecord> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn available_tags(&self) -> &[AvailableTag] {
        &self.available_tags
    }

    pub fn load_source(&self) -> Option<LoadSource> {
        self.load_source
    }

    /// Collection indices of the images that pass the filter, in collection
    /// order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, image)| self.selection.is_empty() || image.matches_any(&self.selection))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn visible_images(&self) -> Vec<&ImageRecord> {
        self.visible_indices()
            .into_iter()
            .map(|index| &self.images[index])
            .collect()
    }

    /// Adds or removes `key` from the selection. Keys that no chip offers are
    /// ignored; returns whether the selection changed.
    pub fn toggle_tag(&mut self, key: &str) -> bool {
        if !self.available_tags.iter().any(|tag| tag.key == key) {
            warn!(key, "ignoring toggle for a tag that is not available");
            return false;
        }
        if !self.selection.remove(key) {
            self.selection.insert(key.to_string());
        }
        true
    }

    /// Returns whether anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        let had_selection = !self.selection.is_empty();
        self.selection.clear();
        had_selection
    }

    /// Writes hydration results. Images missing from `tags` (failed lookups)
    /// end up untagged. Available tags are rebuilt afterwards.
    pub fn apply_tags(&mut self, tags: HashMap<String, Vec<TagRecord>>) {
        for image in &mut self.images {
            match tags.get(&image.address) {
                Some(found) => image.set_tags(found.clone()),
                None => image.clear_tags(),
            }
        }
        self.rebuild_available_tags();
    }

    /// Recounts tags from scratch and drops selected keys that no image
    /// carries any more.
    pub fn rebuild_available_tags(&mut self) {
        let mut by_key: HashMap<&str, usize> = HashMap::new();
        let mut tags: Vec<AvailableTag> = Vec::new();

        for tag in self.images.iter().flat_map(|image| &image.tags) {
            match by_key.get(tag.key.as_str()) {
                Some(&slot) => tags[slot].count += 1,
                None => {
                    by_key.insert(&tag.key, tags.len());
                    tags.push(AvailableTag {
                        key: tag.key.clone(),
                        label: tag.label.clone(),
                        count: 1,
                    });
                }
            }
        }

        tags.sort_by(|a, b| compare_labels(&a.label, &b.label));
        let before = self.selection.len();
        self.selection.retain(|key| by_key.contains_key(key.as_str()));
        if self.selection.len() != before {
            debug!(pruned = before - self.selection.len(), "pruned unavailable tag selections");
        }
        self.available_tags = tags;
    }

    /// "All" followed by one chip per available tag, or `None` when there are
    /// no tags and the chip region should be hidden.
    pub fn chips(&self) -> Option<Vec<ChipView>> {
        if self.available_tags.is_empty() {
            return None;
        }
        let mut chips = Vec::with_capacity(self.available_tags.len() + 1);
        chips.push(ChipView::all(self.selection.is_empty()));
        chips.extend(self.available_tags.iter().map(|tag| {
            ChipView::tag(&tag.key, &tag.label, tag.count, self.selection.contains(&tag.key))
        }));
        Some(chips)
    }

    fn loaded_text(&self) -> String {
        let total = self.images.len();
        let suffix = self
            .load_source
            .and_then(LoadSource::label)
            .map(|label| format!(" ({label})"))
            .unwrap_or_default();
        format!("{total} {} loaded{suffix}.", photos(total))
    }

    pub fn status_text(&self) -> String {
        if self.selection.is_empty() {
            return self.loaded_text();
        }

        let visible = self.visible_indices().len();
        let labels: Vec<&str> = self
            .available_tags
            .iter()
            .filter(|tag| self.selection.contains(&tag.key))
            .map(|tag| tag.label.as_str())
            .collect();
        let labels = if labels.is_empty() {
            "selected tags".to_string()
        } else {
            labels.join(", ")
        };
        format!(
            "{visible} of {} {} for \"{labels}\".",
            self.images.len(),
            photos(visible)
        )
    }

    pub fn hydrating_status_text(&self) -> String {
        format!("{} Reading EXIF tags...", self.loaded_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(labels: &[&str]) -> Vec<TagRecord> {
        labels.iter().map(|l| TagRecord::from_normalized(l)).collect()
    }

    fn state() -> GalleryState {
        let mut state = GalleryState::new();
        state.replace_images(
            LoadSource::Repository,
            vec![
                ImageSource::new("images/a.jpg", "a"),
                ImageSource::new("images/b.jpg", "b"),
                ImageSource::new("images/c.jpg", "c"),
            ],
        );
        let mut found = HashMap::new();
        found.insert("images/a.jpg".to_string(), tags(&["x"]));
        found.insert("images/b.jpg".to_string(), tags(&["Y", "x"]));
        found.insert("images/c.jpg".to_string(), tags(&["z"]));
        state.apply_tags(found);
        state
    }

    #[test]
    fn or_filter_selects_any_match() {
        let mut state = state();
        assert!(state.toggle_tag("x"));
        assert!(state.toggle_tag("z"));
        assert_eq!(state.visible_indices(), vec![0, 1, 2]);

        assert!(state.toggle_tag("z"));
        assert_eq!(state.visible_indices(), vec![0, 1]);

        assert!(state.clear_selection());
        assert_eq!(state.visible_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut state = state();
        assert!(!state.toggle_tag("nope"));
        assert!(state.selection().is_empty());
    }

    #[test]
    fn available_tags_are_counted_and_sorted() {
        let state = state();
        let summary: Vec<_> = state
            .available_tags()
            .iter()
            .map(|t| (t.label.as_str(), t.count))
            .collect();
        assert_eq!(summary, vec![("x", 2), ("Y", 1), ("z", 1)]);
    }

    #[test]
    fn rehydration_prunes_vanished_selections() {
        let mut state = state();
        state.toggle_tag("z");
        state.toggle_tag("x");

        let mut found = HashMap::new();
        found.insert("images/a.jpg".to_string(), tags(&["x"]));
        state.apply_tags(found);

        assert_eq!(state.selection().iter().collect::<Vec<_>>(), vec!["x"]);
        assert!(state.images()[2].tags.is_empty());
    }

    #[test]
    fn chips_hidden_without_tags() {
        let mut state = GalleryState::new();
        state.replace_images(LoadSource::Manifest, vec![ImageSource::new("a.jpg", "a")]);
        assert_eq!(state.chips(), None);

        let state = self::state();
        let chips = state.chips().unwrap();
        assert_eq!(chips.len(), 4);
        assert!(chips[0].active);
        assert_eq!(chips[1].count, Some(2));
    }

    #[test]
    fn status_lines() {
        let mut state = state();
        assert_eq!(state.status_text(), "3 photos loaded.");
        assert_eq!(state.hydrating_status_text(), "3 photos loaded. Reading EXIF tags...");

        state.toggle_tag("z");
        assert_eq!(state.status_text(), "1 of 3 photo for \"z\".");

        state.toggle_tag("y");
        assert_eq!(state.status_text(), "2 of 3 photos for \"Y, z\".");
    }

    #[test]
    fn status_mentions_fallback_source() {
        let mut state = GalleryState::new();
        state.replace_images(
            LoadSource::DirectoryListing,
            vec![ImageSource::new("a.jpg", "a")],
        );
        assert_eq!(state.status_text(), "1 photo loaded (directory fallback).");
    }
}
