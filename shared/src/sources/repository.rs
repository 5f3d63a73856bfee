use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{SourceError, SourceStrategy};
use crate::capabilities::{FetchRequest, FetchedPage, RequestUrl};
use crate::config::GalleryConfig;
use crate::model::{ImageSource, LoadSource};
use crate::naming::{encode_path, is_image_file, label_from_name};

const GITHUB_API: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const PAGES_SUFFIX: &str = ".github.io";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub owner: String,
    pub repo: String,
}

/// Repo behind a GitHub Pages URL: `alice.github.io/photos/` is
/// `alice/photos`, and a bare `alice.github.io` is the user site repo.
pub fn detect_repository(page_url: &Url) -> Option<RepositoryTarget> {
    let host = page_url.host_str()?;
    if !host.ends_with(PAGES_SUFFIX) {
        return None;
    }
    let owner = host.split('.').next().filter(|o| !o.is_empty())?.to_string();
    let repo = page_url
        .path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()))
        .map_or_else(|| format!("{owner}{PAGES_SUFFIX}"), str::to_string);
    Some(RepositoryTarget { owner, repo })
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
}

/// Lists the image folder through the GitHub contents API.
#[derive(Debug, Clone)]
pub struct RepositoryListing {
    target: Option<RepositoryTarget>,
    folder: String,
}

impl RepositoryListing {
    pub fn new(target: Option<RepositoryTarget>, folder: impl Into<String>) -> Self {
        Self {
            target,
            folder: folder.into(),
        }
    }

    /// An explicit `github` block wins over auto-detection, even when it is
    /// incomplete.
    pub fn from_config(config: &GalleryConfig) -> Self {
        let (target, folder) = match &config.github {
            Some(github) => {
                let target = match (non_blank(github.owner.as_deref()), non_blank(github.repo.as_deref())) {
                    (Some(owner), Some(repo)) => Some(RepositoryTarget {
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                    }),
                    _ => None,
                };
                let folder = non_blank(github.folder_path.as_deref())
                    .unwrap_or(&config.image_folder)
                    .to_string();
                (target, folder)
            }
            None => (detect_repository(&config.page_url), config.image_folder.clone()),
        };
        Self::new(target, folder)
    }

    pub fn target(&self) -> Option<&RepositoryTarget> {
        self.target.as_ref()
    }

    fn api_url(&self, target: &RepositoryTarget) -> Result<RequestUrl, SourceError> {
        Ok(RequestUrl::parse(&format!(
            "{GITHUB_API}/repos/{}/{}/contents/{}",
            target.owner,
            target.repo,
            encode_path(&self.folder)
        ))?)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl SourceStrategy for RepositoryListing {
    fn load_source(&self) -> LoadSource {
        LoadSource::Repository
    }

    #[instrument(skip_all, fields(folder = %self.folder))]
    fn request(&self) -> Result<FetchRequest, SourceError> {
        let target = self.target.as_ref().ok_or(SourceError::NoRepository)?;
        let url = self.api_url(target)?;
        debug!(%url, "listing repository folder");
        Ok(FetchRequest::get(url).accept(GITHUB_ACCEPT))
    }

    fn parse(&self, page: &FetchedPage) -> Result<Vec<ImageSource>, SourceError> {
        let payload: Value = page.json()?;
        let Value::Array(entries) = payload else {
            return Err(SourceError::UnexpectedPayload {
                url: page.url().to_string(),
                reason: "expected a JSON array of directory entries".into(),
            });
        };

        let folder = self.folder.trim_matches('/');
        let images: Vec<ImageSource> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<ContentEntry>(entry).ok())
            .filter(|entry| entry.kind == "file" && is_image_file(&entry.name))
            .map(|entry| {
                ImageSource::new(
                    format!("{folder}/{}", encode_path(&entry.name)),
                    label_from_name(&entry.name),
                )
            })
            .collect();

        if images.is_empty() {
            return Err(SourceError::Empty {
                location: self.folder.clone(),
            });
        }
        Ok(images)
    }
}
