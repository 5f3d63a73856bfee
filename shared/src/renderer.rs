use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GalleryConfig;
use crate::model::ImageRecord;
use crate::view::{SentinelView, TileView};
use crate::{DEFAULT_BATCH_SIZE, DEFAULT_INITIAL_BATCH_SIZE, DEFAULT_LEAD_MARGIN_PX};

/// How the shell learns that the sentinel is near the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    /// A visibility observer with the lead margin as root margin; the shell
    /// sends `SentinelIntersected`.
    #[default]
    Observer,
    /// No observer available; the shell forwards throttled scroll positions.
    ScrollPoll,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    pub initial_batch_size: usize,
    pub batch_size: usize,
    pub lead_margin_px: f64,
    pub mode: TriggerMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            lead_margin_px: DEFAULT_LEAD_MARGIN_PX,
            mode: TriggerMode::default(),
        }
    }
}

impl RendererConfig {
    pub fn new(config: &GalleryConfig, mode: TriggerMode) -> Self {
        Self {
            initial_batch_size: config.initial_batch_size.max(1),
            batch_size: config.batch_size.max(1),
            lead_margin_px: config.lead_margin_px,
            mode,
        }
    }
}

/// Puts the visible subset on screen a batch at a time.
///
/// `rendered` never exceeds `visible.len()`. The sentinel is hidden and
/// untracked once everything is rendered, and comes back on the next reset
/// that leaves something unrendered.
#[derive(Debug, Clone, Default)]
pub struct IncrementalRenderer {
    config: RendererConfig,
    visible: Vec<usize>,
    rendered: usize,
}

impl IncrementalRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            visible: Vec::new(),
            rendered: 0,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn has_more(&self) -> bool {
        self.rendered < self.visible.len()
    }

    pub fn sentinel(&self) -> SentinelView {
        let has_more = self.has_more();
        SentinelView {
            hidden: !has_more,
            tracked: has_more && self.config.mode == TriggerMode::Observer,
        }
    }

    /// Tiles currently on screen.
    pub fn tiles(&self, images: &[ImageRecord]) -> Vec<TileView> {
        self.tiles_between(images, 0, self.rendered)
    }

    fn tiles_between(&self, images: &[ImageRecord], start: usize, end: usize) -> Vec<TileView> {
        self.visible[start..end]
            .iter()
            .filter_map(|&index| images.get(index).map(|image| TileView::new(index, image)))
            .collect()
    }

    /// Clears the surface and renders the first batch of `visible`.
    pub fn reset(&mut self, visible: Vec<usize>) {
        self.visible = visible;
        self.rendered = 0;
        self.append_batch(self.config.initial_batch_size);
    }

    /// Returns how many tiles were appended.
    pub fn append_next(&mut self) -> usize {
        self.append_batch(self.config.batch_size)
    }

    fn append_batch(&mut self, batch_size: usize) -> usize {
        if !self.has_more() {
            return 0;
        }
        let start = self.rendered;
        let end = start.saturating_add(batch_size).min(self.visible.len());
        self.rendered = end;
        debug!(rendered = end, visible = self.visible.len(), "appended tile batch");
        end - start
    }

    /// Observer mode: the sentinel entered the extended viewport.
    pub fn on_sentinel_visible(&mut self) -> usize {
        self.append_next()
    }

    /// Poll mode: `sentinel_top` is the sentinel's offset from the top of the
    /// viewport. Ignored in observer mode and while the sentinel is hidden.
    pub fn on_scroll(&mut self, sentinel_top: f64, viewport_height: f64) -> usize {
        if self.config.mode != TriggerMode::ScrollPoll || !self.has_more() {
            return 0;
        }
        if sentinel_top <= viewport_height + self.config.lead_margin_px {
            self.append_next()
        } else {
            0
        }
    }
}
