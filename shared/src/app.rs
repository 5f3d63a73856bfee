use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::config::GalleryConfig;
use crate::detail::DetailView;
use crate::event::Event;
use crate::gallery::GalleryState;
use crate::hydration::Hydration;
use crate::metadata_cache::{Lookup, MetadataCache};
use crate::renderer::{IncrementalRenderer, RendererConfig, TriggerMode};
use crate::sources::{ResolvedSources, SourceResolver, Step};
use crate::view::ViewModel;
use crate::GalleryError;

#[derive(Default)]
pub struct Gallery;

/// Everything the gallery knows. Only [`Gallery`] mutates it.
#[derive(Debug, Default)]
pub struct Model {
    config: Option<GalleryConfig>,
    state: GalleryState,
    renderer: IncrementalRenderer,
    resolver: SourceResolver,
    cache: MetadataCache,
    detail: DetailView,
    hydration: Option<Hydration>,
    load_generation: u64,
    status: String,
    error: Option<GalleryError>,
}

impl Model {
    pub fn config(&self) -> Option<&GalleryConfig> {
        self.config.as_ref()
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn renderer(&self) -> &IncrementalRenderer {
        &self.renderer
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn hydration(&self) -> Option<&Hydration> {
        self.hydration.as_ref()
    }

    /// Bumped by every `Start`; source responses carry the value they were
    /// requested under.
    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn error(&self) -> Option<&GalleryError> {
        self.error.as_ref()
    }
}

impl crux_core::App for Gallery {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "update");

        match event {
            Event::Start {
                page_url,
                config,
                extractor_available,
                trigger,
            } => {
                Self::start(model, caps, &page_url, config, extractor_available, trigger);
                caps.render.render();
            }

            Event::SourceFetched {
                generation,
                response,
            } => {
                if generation != model.load_generation {
                    debug!(stale = generation, current = model.load_generation, "dropping stale source response");
                    return;
                }
                let Some(step) = model.resolver.on_response(*response) else {
                    warn!("source response arrived with no request pending");
                    return;
                };
                Self::step(model, caps, step);
                caps.render.render();
            }

            Event::MetadataExtracted { address, result } => {
                model.cache.settle(&address, &result);
                let detail_changed = model.detail.settle(&address, &result);
                let hydrated = model
                    .hydration
                    .as_mut()
                    .is_some_and(|h| h.settle(&address, &result) && h.is_complete());
                if hydrated {
                    if let Some(hydration) = model.hydration.take() {
                        model.state.apply_tags(hydration.into_tags());
                        Self::refresh_filter(model);
                    }
                }
                if detail_changed || hydrated {
                    caps.render.render();
                }
            }

            Event::AllChipSelected => {
                model.state.clear_selection();
                Self::refresh_filter(model);
                caps.render.render();
            }

            Event::TagChipToggled { key } => {
                if model.state.toggle_tag(&key) {
                    Self::refresh_filter(model);
                    caps.render.render();
                }
            }

            Event::SentinelIntersected => {
                if model.renderer.on_sentinel_visible() > 0 {
                    caps.render.render();
                }
            }

            Event::Scrolled {
                sentinel_top,
                viewport_height,
            } => {
                if model.renderer.on_scroll(sentinel_top, viewport_height) > 0 {
                    caps.render.render();
                }
            }

            Event::TileActivated { index } => {
                let Some(image) = model.state.image(index) else {
                    warn!(index, "activated tile is not in the collection");
                    return;
                };
                let lookup = model.cache.lookup(&image.address);
                model.detail.open(index, image, &lookup);
                if lookup == Lookup::Fetch {
                    Self::request_metadata(caps, image.address.clone());
                }
                caps.render.render();
            }

            Event::DetailClosed => {
                if model.detail.close() {
                    caps.render.render();
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            status: model.status.clone(),
            tiles: model.renderer.tiles(model.state.images()),
            sentinel: model.renderer.sentinel(),
            chips: model.state.chips(),
            detail: model.detail.panel().cloned(),
            total: model.state.len(),
            visible: model.renderer.visible_len(),
            error: model.error.clone(),
        }
    }
}

impl Gallery {
    /// Starts a fresh load. Whatever an earlier load left in flight is
    /// ignored when it lands; the metadata cache survives unless extractor
    /// availability changed.
    fn start(
        model: &mut Model,
        caps: &Capabilities,
        page_url: &str,
        config: Value,
        extractor_available: bool,
        trigger: TriggerMode,
    ) {
        model.load_generation += 1;
        model.hydration = None;
        model.error = None;
        model.detail.close();

        let config = match GalleryConfig::parse_page_url(page_url)
            .and_then(|url| GalleryConfig::from_json(config, url))
        {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "gallery config rejected");
                Self::fail_load(model, e.into());
                return;
            }
        };

        if model.cache.is_available() != extractor_available || model.config.is_none() {
            model.cache = MetadataCache::new(extractor_available);
        }
        model.renderer = IncrementalRenderer::new(RendererConfig::new(&config, trigger));
        model.resolver = SourceResolver::standard(&config);
        model.config = Some(config);

        let step = model.resolver.start();
        Self::step(model, caps, step);
    }

    fn step(model: &mut Model, caps: &Capabilities, step: Step) {
        match step {
            Step::Fetch(request) => {
                let generation = model.load_generation;
                debug!(url = %request.url(), "requesting image source");
                request.send(&caps.http, move |response| Event::SourceFetched {
                    generation,
                    response: Box::new(response),
                });
            }
            Step::Resolved(resolved) => Self::loaded(model, caps, resolved),
            Step::Exhausted(e) => {
                warn!(error = %e, "no image source could be loaded");
                Self::fail_load(model, e.into());
            }
        }
    }

    /// Renders the first batch untagged, then hydrates tags in the
    /// background when an extractor is present.
    fn loaded(model: &mut Model, caps: &Capabilities, resolved: ResolvedSources) {
        info!(source = %resolved.source, images = resolved.images.len(), "gallery loaded");
        model.state.replace_images(resolved.source, resolved.images);
        Self::refresh_filter(model);

        if model.state.is_empty() || !model.cache.is_available() {
            return;
        }

        let addresses = model.state.images().iter().map(|image| image.address.clone());
        let (hydration, to_fetch) = Hydration::start(addresses, &mut model.cache);
        for address in to_fetch {
            Self::request_metadata(caps, address);
        }

        if hydration.is_complete() {
            model.state.apply_tags(hydration.into_tags());
            Self::refresh_filter(model);
        } else {
            model.status = model.state.hydrating_status_text();
            model.hydration = Some(hydration);
        }
    }

    /// Chips hidden, tiles cleared, sentinel hidden; no retry.
    fn fail_load(model: &mut Model, error: GalleryError) {
        model.state.clear();
        model.renderer.reset(Vec::new());
        model.status = error.user_facing_message();
        model.error = Some(error);
    }

    fn refresh_filter(model: &mut Model) {
        model.renderer.reset(model.state.visible_indices());
        model.status = model.state.status_text();
    }

    fn request_metadata(caps: &Capabilities, address: String) {
        caps.metadata.extract(address.clone(), move |result| Event::MetadataExtracted {
            address,
            result: Box::new(result),
        });
    }
}
