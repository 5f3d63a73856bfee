use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::MetadataResult;
use crate::renderer::TriggerMode;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    // Page
    /// Sent once the page is ready, and again to reload. `config` is the
    /// page's loose gallery config object.
    #[serde(rename_all = "camelCase")]
    Start {
        page_url: String,
        #[serde(default)]
        config: Value,
        #[serde(default)]
        extractor_available: bool,
        #[serde(default)]
        trigger: TriggerMode,
    },

    // Filter
    AllChipSelected,
    TagChipToggled {
        key: String,
    },

    // Incremental rendering
    SentinelIntersected,
    #[serde(rename_all = "camelCase")]
    Scrolled {
        sentinel_top: f64,
        viewport_height: f64,
    },

    // Detail
    TileActivated {
        index: usize,
    },
    DetailClosed,

    // Capability responses (boxed to keep enum size small)
    #[serde(skip)]
    SourceFetched {
        generation: u64,
        response: Box<crux_http::Result<crux_http::Response<String>>>,
    },
    #[serde(skip)]
    MetadataExtracted {
        address: String,
        result: Box<MetadataResult>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::AllChipSelected => "all_chip_selected",
            Event::TagChipToggled { .. } => "tag_chip_toggled",
            Event::SentinelIntersected => "sentinel_intersected",
            Event::Scrolled { .. } => "scrolled",
            Event::TileActivated { .. } => "tile_activated",
            Event::DetailClosed => "detail_closed",
            Event::SourceFetched { .. } => "source_fetched",
            Event::MetadataExtracted { .. } => "metadata_extracted",
        }
    }
}
