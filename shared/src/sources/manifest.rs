use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{folder_url, SourceError, SourceStrategy};
use crate::capabilities::{FetchRequest, FetchedPage};
use crate::config::GalleryConfig;
use crate::model::{ImageSource, LoadSource};
use crate::naming::{encode_path, is_image_file, label_from_name};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Reads `{folder}/manifest.json`: either a bare array or `{"images": [...]}`,
/// where each entry is a file name or `{"src": ..., "title": ...}`.
#[derive(Debug, Clone)]
pub struct Manifest {
    page_url: Url,
    folder: String,
}

impl Manifest {
    pub fn new(page_url: Url, folder: impl Into<String>) -> Self {
        Self {
            page_url,
            folder: folder.into(),
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Self {
        Self::new(config.page_url.clone(), config.image_folder.clone())
    }

    /// Entries that do not describe an image are dropped silently.
    pub fn parse_entries(&self, manifest: &Value) -> Vec<ImageSource> {
        let items = match manifest {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("images") {
                Some(Value::Array(items)) => items,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        items
            .iter()
            .filter_map(|item| self.parse_entry(item))
            .filter(|image| is_image_file(&image.address))
            .collect()
    }

    fn parse_entry(&self, item: &Value) -> Option<ImageSource> {
        match item {
            Value::String(name) => Some(ImageSource::new(
                self.local_address(name),
                label_from_name(name),
            )),
            Value::Object(entry) => {
                let src = entry.get("src")?.as_str()?;
                let address = if src.starts_with("http") {
                    src.to_string()
                } else {
                    self.local_address(src)
                };
                let label = entry
                    .get("title")
                    .and_then(Value::as_str)
                    .filter(|title| !title.is_empty())
                    .map_or_else(|| label_from_name(src), str::to_string);
                Some(ImageSource::new(address, label))
            }
            _ => None,
        }
    }

    fn local_address(&self, path: &str) -> String {
        format!("{}/{}", self.folder, encode_path(path))
    }
}

impl SourceStrategy for Manifest {
    fn load_source(&self) -> LoadSource {
        LoadSource::Manifest
    }

    fn request(&self) -> Result<FetchRequest, SourceError> {
        Ok(FetchRequest::get(folder_url(&self.page_url, &self.folder, MANIFEST_FILE)?).no_store())
    }

    #[instrument(skip_all, fields(folder = %self.folder))]
    fn parse(&self, page: &FetchedPage) -> Result<Vec<ImageSource>, SourceError> {
        let manifest: Value = page.json()?;
        let images = self.parse_entries(&manifest);
        debug!(count = images.len(), "manifest parsed");

        if images.is_empty() {
            return Err(SourceError::Empty {
                location: format!("{}/{MANIFEST_FILE}", self.folder),
            });
        }
        Ok(images)
    }
}
