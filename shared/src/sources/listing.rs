use std::collections::HashSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument};
use url::Url;

use super::{folder_url, SourceError, SourceStrategy};
use crate::capabilities::{FetchRequest, FetchedPage, RequestUrl};
use crate::config::GalleryConfig;
use crate::model::{ImageSource, LoadSource};
use crate::naming::{decode_segment, is_image_file, label_from_name};

static ANCHOR_HREF: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static CHAR_REF: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static COMMENT: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

// `href` must start an attribute, so `data-href` and friends never match.
fn anchor_href() -> Result<&'static Regex, SourceError> {
    compiled(
        &ANCHOR_HREF,
        r#"(?is)<a\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
    )
}

fn comment() -> Result<&'static Regex, SourceError> {
    compiled(&COMMENT, r"(?s)<!--.*?-->")
}

fn char_ref() -> Result<&'static Regex, SourceError> {
    compiled(&CHAR_REF, r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);")
}

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
) -> Result<&'static Regex, SourceError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| SourceError::UnexpectedPayload {
            url: String::new(),
            reason: format!("listing pattern failed to compile: {e}"),
        })
}

/// Decodes the character references a server might put in an `href`.
/// Unknown named references are left as written.
fn decode_char_refs(pattern: &Regex, raw: &str) -> String {
    pattern
        .replace_all(raw, |caps: &Captures<'_>| {
            let body = &caps[1];
            let decoded = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => body
                    .strip_prefix("#x")
                    .or_else(|| body.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| body.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Every `href` value from the anchors in an HTML document, in document order.
/// Anchors inside comments are not links.
pub(crate) fn anchor_hrefs(html: &str) -> Result<Vec<String>, SourceError> {
    let anchors = anchor_href()?;
    let refs = char_ref()?;
    let html = comment()?.replace_all(html, "");
    Ok(anchors
        .captures_iter(&html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| decode_char_refs(refs, m.as_str()))
        .collect())
}

/// Scrapes an auto-index page (nginx `autoindex`, Apache `mod_autoindex`,
/// `python -m http.server`) for links to images.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    page_url: Url,
    folder: String,
}

impl DirectoryListing {
    pub fn new(page_url: Url, folder: impl Into<String>) -> Self {
        Self {
            page_url,
            folder: folder.into(),
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Self {
        Self::new(config.page_url.clone(), config.image_folder.clone())
    }
}

impl SourceStrategy for DirectoryListing {
    fn load_source(&self) -> LoadSource {
        LoadSource::DirectoryListing
    }

    fn request(&self) -> Result<FetchRequest, SourceError> {
        Ok(FetchRequest::get(folder_url(&self.page_url, &self.folder, "")?).no_store())
    }

    /// Links resolve against the URL that was requested.
    #[instrument(skip_all, fields(folder = %self.folder))]
    fn parse(&self, page: &FetchedPage) -> Result<Vec<ImageSource>, SourceError> {
        if page.body().trim().is_empty() {
            return Err(SourceError::UnexpectedPayload {
                url: page.url().to_string(),
                reason: "directory listing response was empty".into(),
            });
        }

        let base = page.url().to_url()?;
        let mut seen = HashSet::new();
        let mut images = Vec::new();

        for href in anchor_hrefs(page.body())? {
            if href.is_empty() || href.starts_with('#') || href.starts_with('?') {
                continue;
            }
            let Ok(resolved) = RequestUrl::resolve(&base, &href) else {
                debug!(%href, "skipping unresolvable link");
                continue;
            };
            let Ok(resolved) = resolved.to_url() else {
                continue;
            };

            let Some(file_name) = resolved
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .and_then(decode_segment)
            else {
                continue;
            };
            if !is_image_file(&file_name) {
                continue;
            }
            if !seen.insert(resolved.path().to_lowercase()) {
                continue;
            }

            images.push(ImageSource::new(resolved.as_str(), label_from_name(&file_name)));
        }

        if images.is_empty() {
            return Err(SourceError::Empty {
                location: format!("{}/", self.folder),
            });
        }
        Ok(images)
    }
}
