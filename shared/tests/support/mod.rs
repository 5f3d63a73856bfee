#![allow(dead_code)]

use std::collections::HashMap;

use crux_core::testing::AppTester;
use crux_http::testing::ResponseBuilder;
use gallery_shared::capabilities::{
    MetadataError, MetadataOperation, MetadataRecord, MetadataResult, MetadataValue,
};
use gallery_shared::view::TileView;
use gallery_shared::{Effect, Event, Gallery, Model, TriggerMode, ViewModel};
use serde_json::{json, Value};

pub const PAGE: &str = "https://example.com/gallery/";
pub const MANIFEST: &str = "https://example.com/gallery/images/manifest.json";
pub const LISTING: &str = "https://example.com/gallery/images/";

/// Plays the web shell: canned bodies by URL for `http`, canned records by
/// address for `metadata`. Unrouted URLs answer with an empty page, which no
/// source accepts.
pub struct Harness {
    pub app: AppTester<Gallery, Effect>,
    pub model: Model,
    routes: HashMap<String, String>,
    records: HashMap<String, MetadataRecord>,
    /// Every URL requested, in order.
    pub requested: Vec<String>,
    /// Every address sent to the extractor, in order.
    pub extractions: Vec<String>,
    /// Extractions not answered yet.
    pub pending: Vec<String>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            app: AppTester::default(),
            model: Model::default(),
            routes: HashMap::new(),
            records: HashMap::new(),
            requested: Vec::new(),
            extractions: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn route(mut self, url: &str, body: impl Into<String>) -> Self {
        self.routes.insert(url.to_string(), body.into());
        self
    }

    pub fn keywords(self, address: &str, keywords: &str) -> Self {
        self.record(
            address,
            MetadataRecord::new().with("Keywords", MetadataValue::text(keywords)),
        )
    }

    pub fn record(mut self, address: &str, record: MetadataRecord) -> Self {
        self.records.insert(address.to_string(), record);
        self
    }

    pub fn set_record(&mut self, address: &str, record: MetadataRecord) {
        self.records.insert(address.to_string(), record);
    }

    /// Sends `Start` and answers source requests until the image list settles.
    pub fn start(&mut self, page: &str, config: Value, extractor: bool, trigger: TriggerMode) -> Vec<Effect> {
        self.send(Event::Start {
            page_url: page.to_string(),
            config,
            extractor_available: extractor,
            trigger,
        })
    }

    pub fn load(&mut self, page: &str, extractor: bool) -> Vec<Effect> {
        self.start(page, json!({}), extractor, TriggerMode::Observer)
    }

    /// Applies `event`, answering any source fetch it triggers. Returns every
    /// effect seen along the way.
    pub fn send(&mut self, event: Event) -> Vec<Effect> {
        let mut seen = Vec::new();
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let update = self.app.update(event, &mut self.model);
            for effect in update.effects {
                match &effect {
                    Effect::Http(request) => {
                        let url = request.operation.url.clone();
                        let body = self.routes.get(&url).cloned().unwrap_or_default();
                        self.requested.push(url);
                        next = Some(Event::SourceFetched {
                            generation: self.model.load_generation(),
                            response: Box::new(Ok(ResponseBuilder::ok().body(body).build())),
                        });
                    }
                    Effect::Metadata(request) => {
                        let MetadataOperation::Extract { address } = &request.operation;
                        self.extractions.push(address.clone());
                        self.pending.push(address.clone());
                    }
                    Effect::Render(_) => {}
                }
                seen.push(effect);
            }
        }
        seen
    }

    /// Answers one pending extraction.
    pub fn extract(&mut self, address: &str) -> Vec<Effect> {
        self.pending.retain(|pending| pending != address);
        let result: MetadataResult = self
            .records
            .get(address)
            .cloned()
            .ok_or_else(|| MetadataError::lookup_failed(address, "no metadata segment"));
        self.send(Event::MetadataExtracted {
            address: address.to_string(),
            result: Box::new(result),
        })
    }

    /// Answers every pending extraction in request order.
    pub fn extract_all(&mut self) {
        for address in std::mem::take(&mut self.pending) {
            self.extract(&address);
        }
    }

    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }

    pub fn status(&self) -> String {
        self.view().status
    }

    pub fn labels(&self) -> Vec<String> {
        labels(&self.view().tiles)
    }
}

pub fn manifest_of(names: &[&str]) -> String {
    serde_json::to_string(names).unwrap()
}

pub fn labels(tiles: &[TileView]) -> Vec<String> {
    tiles.iter().map(|t| t.label.clone()).collect()
}

pub fn rendered(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Render(_)))
}
