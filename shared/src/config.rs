//! Page configuration.
//!
//! The host page publishes a loosely typed config object (`imageFolder`,
//! `initialBatchSize`, `batchSize`, `github`, ...). It is read once at start-up
//! and normalized here: numeric fields accept numbers or numeric strings and
//! fall back to their defaults when missing, zero or unparsable, then are
//! floored and clamped to at least 1.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{DEFAULT_BATCH_SIZE, DEFAULT_IMAGE_FOLDER, DEFAULT_INITIAL_BATCH_SIZE, DEFAULT_LEAD_MARGIN_PX};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(String),

    #[error("invalid page URL '{url}': {reason}")]
    InvalidPageUrl { url: String, reason: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

/// Explicit repository for the repository-listing source. Fields stay
/// optional because pages routinely ship half-filled overrides; the source
/// treats a missing owner or repo as "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    image_folder: Option<Value>,
    #[serde(default)]
    initial_batch_size: Option<Value>,
    #[serde(default)]
    batch_size: Option<Value>,
    #[serde(default)]
    lead_margin_px: Option<Value>,
    #[serde(default)]
    github: Option<RepoConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryConfig {
    /// Folder holding the images, relative to the page; no trailing slash.
    pub image_folder: String,
    pub initial_batch_size: usize,
    pub batch_size: usize,
    /// How far below the viewport the sentinel may be and still trigger a batch.
    pub lead_margin_px: f64,
    pub github: Option<RepoConfig>,
    /// Location of the hosting page; relative fetches resolve against it.
    #[serde(serialize_with = "serialize_url")]
    pub page_url: Url,
}

fn serialize_url<S: serde::Serializer>(url: &Url, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(url.as_str())
}

impl GalleryConfig {
    pub fn new(page_url: Url) -> Self {
        Self {
            image_folder: DEFAULT_IMAGE_FOLDER.to_string(),
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            lead_margin_px: DEFAULT_LEAD_MARGIN_PX,
            github: None,
            page_url,
        }
    }

    pub fn parse_page_url(page_url: &str) -> Result<Url, ConfigError> {
        Url::parse(page_url).map_err(|e| ConfigError::InvalidPageUrl {
            url: page_url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads the page's config object. `null` or `{}` yields the defaults.
    pub fn from_json(value: Value, page_url: Url) -> Result<Self, ConfigError> {
        let raw: RawConfig = match value {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other).map_err(|e| ConfigError::Json(e.to_string()))?,
        };

        let image_folder = raw
            .image_folder
            .as_ref()
            .and_then(Value::as_str)
            .map(|folder| folder.trim().trim_end_matches('/'))
            .filter(|folder| !folder.is_empty())
            .unwrap_or(DEFAULT_IMAGE_FOLDER)
            .to_string();

        let config = Self {
            image_folder,
            initial_batch_size: coerce_batch_size(
                raw.initial_batch_size.as_ref(),
                DEFAULT_INITIAL_BATCH_SIZE,
            ),
            batch_size: coerce_batch_size(raw.batch_size.as_ref(), DEFAULT_BATCH_SIZE),
            lead_margin_px: coerce_number(raw.lead_margin_px.as_ref())
                .filter(|margin| margin.is_finite() && *margin >= 0.0)
                .unwrap_or(DEFAULT_LEAD_MARGIN_PX),
            github: raw.github,
            page_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str, page_url: Url) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        Self::from_json(value, page_url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_folder.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "imageFolder",
                reason: "must not be blank".into(),
            });
        }
        if self.initial_batch_size == 0 {
            return Err(ConfigError::Validation {
                field: "initialBatchSize",
                reason: "must be at least 1".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Validation {
                field: "batchSize",
                reason: "must be at least 1".into(),
            });
        }
        if !self.lead_margin_px.is_finite() || self.lead_margin_px < 0.0 {
            return Err(ConfigError::Validation {
                field: "leadMarginPx",
                reason: format!("must be a non-negative number, got {}", self.lead_margin_px),
            });
        }
        Ok(())
    }
}

/// Numeric reading of a loosely typed config value: numbers as-is, strings
/// parsed after trimming, booleans as 0/1.
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn coerce_batch_size(value: Option<&Value>, default: usize) -> usize {
    let Some(n) = coerce_number(value).filter(|n| n.is_finite() && *n != 0.0) else {
        return default;
    };
    let floored = n.floor();
    if floored < 1.0 {
        1
    } else if floored >= usize::MAX as f64 {
        usize::MAX
    } else {
        floored as usize
    }
}
