//! Shared core of the photo gallery.
//!
//! The core owns every decision the gallery makes: where the image list comes
//! from, which images are visible under the current tag filter, how many tiles
//! are on screen, what the status line says and how camera parameters are
//! formatted. It is a Crux app: the shell (a browser page, typically through
//! wasm) performs the effects the core asks for through [`Capabilities`]:
//!
//! - `http`: `fetch` for the image list
//! - `metadata`: an EXIF/XMP reader, which may be missing
//! - `render`: redraw from [`ViewModel`]
//!
//! Interaction enters through [`Event`]s; capability answers come back as
//! events too.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod detail;
pub mod event;
pub mod gallery;
pub mod hydration;
pub mod metadata_cache;
pub mod model;
pub mod naming;
pub mod normalize;
pub mod renderer;
pub mod sources;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use app::{Gallery, Model};
pub use capabilities::{Capabilities, Effect};
pub use config::GalleryConfig;
pub use event::Event;
pub use model::{AvailableTag, ImageRecord, ImageSource, LoadSource, TagRecord};
pub use renderer::TriggerMode;
pub use view::ViewModel;

pub const DEFAULT_IMAGE_FOLDER: &str = "images";
pub const DEFAULT_INITIAL_BATCH_SIZE: usize = 18;
pub const DEFAULT_BATCH_SIZE: usize = 12;
pub const DEFAULT_LEAD_MARGIN_PX: f64 = 420.0;

pub const LOAD_FAILURE_MESSAGE: &str = "Unable to load photos automatically. Use GitHub Pages, a server with /images/ listing, or images/manifest.json.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Handled where it happened; the gallery keeps working.
    Recovered,
    /// Ends the current operation; surfaced to the user.
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    SourceUnavailable,
    AllSourcesExhausted,
    MetadataLookupFailed,
    MetadataCapabilityAbsent,
    InvalidConfig,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SourceUnavailable => "SOURCE_UNAVAILABLE",
            Self::AllSourcesExhausted => "ALL_SOURCES_EXHAUSTED",
            Self::MetadataLookupFailed => "METADATA_LOOKUP_FAILED",
            Self::MetadataCapabilityAbsent => "METADATA_CAPABILITY_ABSENT",
            Self::InvalidConfig => "INVALID_CONFIG",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::SourceUnavailable
            | Self::MetadataLookupFailed
            | Self::MetadataCapabilityAbsent => ErrorSeverity::Recovered,
            Self::AllSourcesExhausted | Self::InvalidConfig => ErrorSeverity::Terminal,
        }
    }
}

/// Error as the shell sees it. Module errors ([`sources::SourceError`],
/// [`capabilities::MetadataError`], [`config::ConfigError`]) convert into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub context: BTreeMap<String, String>,
}

impl GalleryError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::AllSourcesExhausted => LOAD_FAILURE_MESSAGE.into(),
            ErrorKind::MetadataCapabilityAbsent => detail::CAPABILITY_MISSING.into(),
            ErrorKind::MetadataLookupFailed => detail::UNAVAILABLE.into(),
            ErrorKind::SourceUnavailable | ErrorKind::InvalidConfig => self.message.clone(),
        }
    }
}

impl std::fmt::Display for GalleryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl std::error::Error for GalleryError {}

impl From<sources::SourceError> for GalleryError {
    fn from(e: sources::SourceError) -> Self {
        GalleryError::new(ErrorKind::SourceUnavailable, e.to_string())
    }
}

impl From<sources::ResolveError> for GalleryError {
    fn from(e: sources::ResolveError) -> Self {
        e.failures().iter().fold(
            GalleryError::new(ErrorKind::AllSourcesExhausted, e.to_string()),
            |err, (source, failure)| err.with_context(source.name(), failure.to_string()),
        )
    }
}

impl From<capabilities::MetadataError> for GalleryError {
    fn from(e: capabilities::MetadataError) -> Self {
        let kind = match e {
            capabilities::MetadataError::Unavailable => ErrorKind::MetadataCapabilityAbsent,
            capabilities::MetadataError::LookupFailed { .. } => ErrorKind::MetadataLookupFailed,
        };
        GalleryError::new(kind, e.to_string())
    }
}

impl From<config::ConfigError> for GalleryError {
    fn from(e: config::ConfigError) -> Self {
        GalleryError::new(ErrorKind::InvalidConfig, e.to_string())
    }
}
