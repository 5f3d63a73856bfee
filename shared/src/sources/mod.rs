//! Image-list discovery.
//!
//! A [`SourceResolver`] holds an ordered list of [`SourceStrategy`]s and tries
//! them one after another until one yields at least one image. It is a small
//! state machine: each [`Step::Fetch`] is one request for the shell, and the
//! answer comes back through [`SourceResolver::on_response`]. Strategies never
//! run concurrently, and a strategy that fails for any reason (missing repo
//! info, transport error, non-2xx, malformed payload, nothing image-like in the
//! payload) just hands over to the next one.

mod listing;
mod manifest;
mod repository;

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::capabilities::{FetchRequest, FetchResult, FetchedPage, HttpError, RequestUrl};
use crate::config::GalleryConfig;
use crate::model::{ImageSource, LoadSource};
use crate::naming::compare_labels;

pub use self::listing::DirectoryListing;
pub use self::manifest::Manifest;
pub use self::repository::{detect_repository, RepositoryListing, RepositoryTarget};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("not running on GitHub Pages and no explicit repo config found")]
    NoRepository,

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("unexpected payload from {url}: {reason}")]
    UnexpectedPayload { url: String, reason: String },

    #[error("no image files found in \"{location}\"")]
    Empty { location: String },
}

/// One way of producing the image list: one GET, then a parse of its body.
pub trait SourceStrategy: Send + Sync {
    fn load_source(&self) -> LoadSource;

    fn name(&self) -> &'static str {
        self.load_source().name()
    }

    /// Fails without a request when the strategy cannot apply.
    fn request(&self) -> Result<FetchRequest, SourceError>;

    /// Images in discovery order; the resolver sorts them. An empty list is
    /// reported as [`SourceError::Empty`], never as `Ok(vec![])`.
    fn parse(&self, page: &FetchedPage) -> Result<Vec<ImageSource>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSources {
    pub source: LoadSource,
    pub images: Vec<ImageSource>,
}

/// Every strategy failed. Failures are kept in the order the strategies ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    failures: Vec<(LoadSource, SourceError)>,
}

impl ResolveError {
    pub fn failures(&self) -> &[(LoadSource, SourceError)] {
        &self.failures
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all {} image sources failed", self.failures.len())?;
        for (source, failure) in &self.failures {
            write!(f, "; {source}: {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolveError {}

/// What the resolver needs next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Fetch(FetchRequest),
    Resolved(ResolvedSources),
    Exhausted(ResolveError),
}

#[derive(Default)]
pub struct SourceResolver {
    strategies: Vec<Box<dyn SourceStrategy>>,
    current: usize,
    pending: Option<RequestUrl>,
    failures: Vec<(LoadSource, SourceError)>,
}

impl SourceResolver {
    pub fn new(strategies: Vec<Box<dyn SourceStrategy>>) -> Self {
        Self {
            strategies,
            ..Self::default()
        }
    }

    /// Repository listing, then directory listing, then manifest.
    pub fn standard(config: &GalleryConfig) -> Self {
        Self::new(vec![
            Box::new(RepositoryListing::from_config(config)),
            Box::new(DirectoryListing::from_config(config)),
            Box::new(Manifest::from_config(config)),
        ])
    }

    pub fn strategies(&self) -> impl Iterator<Item = LoadSource> + '_ {
        self.strategies.iter().map(|s| s.load_source())
    }

    /// The URL of the request the shell is working on, if any.
    pub fn pending(&self) -> Option<&RequestUrl> {
        self.pending.as_ref()
    }

    /// Starts over from the first strategy.
    pub fn start(&mut self) -> Step {
        self.current = 0;
        self.pending = None;
        self.failures.clear();
        self.advance()
    }

    /// Feeds the shell's answer to the pending request. `None` when nothing
    /// was pending.
    pub fn on_response(
        &mut self,
        response: crux_http::Result<crux_http::Response<String>>,
    ) -> Option<Step> {
        let url = self.pending.take()?;
        Some(self.on_fetched(FetchedPage::from_response(&url, response)))
    }

    fn on_fetched(&mut self, fetched: FetchResult) -> Step {
        self.pending = None;
        let Some(strategy) = self.strategies.get(self.current) else {
            return self.exhausted();
        };
        let source = strategy.load_source();
        let outcome = match fetched.map_err(SourceError::from).and_then(|page| strategy.parse(&page)) {
            Ok(images) if images.is_empty() => Err(SourceError::Empty {
                location: strategy.name().to_string(),
            }),
            other => other,
        };

        match outcome {
            Ok(mut images) => {
                images.sort_by(|a, b| compare_labels(&a.label, &b.label));
                info!(source = strategy.name(), count = images.len(), "image list resolved");
                self.failures.clear();
                Step::Resolved(ResolvedSources { source, images })
            }
            Err(e) => {
                self.fail(source, e);
                self.advance()
            }
        }
    }

    // Skips strategies that fail before a request until one needs the shell.
    fn advance(&mut self) -> Step {
        while let Some(strategy) = self.strategies.get(self.current) {
            match strategy.request() {
                Ok(request) => {
                    self.pending = Some(request.url().clone());
                    return Step::Fetch(request);
                }
                Err(e) => {
                    let source = strategy.load_source();
                    self.fail(source, e);
                }
            }
        }
        self.exhausted()
    }

    fn fail(&mut self, source: LoadSource, error: SourceError) {
        warn!(source = source.name(), error = %error, "image source failed; falling through");
        self.failures.push((source, error));
        self.current += 1;
    }

    fn exhausted(&mut self) -> Step {
        Step::Exhausted(ResolveError {
            failures: std::mem::take(&mut self.failures),
        })
    }
}

impl fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceResolver")
            .field("strategies", &self.strategies().collect::<Vec<_>>())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// `{folder}/{rest}` resolved against the page, the way `fetch` resolves a
/// relative path.
fn folder_url(page_url: &Url, folder: &str, rest: &str) -> Result<RequestUrl, SourceError> {
    Ok(RequestUrl::resolve(page_url, &format!("{folder}/{rest}"))?)
}
