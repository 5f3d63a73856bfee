//! Shell capabilities.
//!
//! HTTP and rendering are Crux's own; metadata extraction is a custom
//! capability the web shell answers with its EXIF reader.
mod http;
mod metadata;

pub use crux_core::render::Render;
pub use crux_http::Http;

pub use self::http::{
    FetchRequest, FetchResult, FetchedPage, HttpCapability, HttpError, RequestUrl, ACCEPT,
    CACHE_CONTROL,
};
pub use self::metadata::{
    Metadata, MetadataCapability, MetadataError, MetadataOperation, MetadataRecord,
    MetadataResult, MetadataValue,
};

use crate::app::Gallery;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "Gallery")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub metadata: Metadata<Event>,
}
