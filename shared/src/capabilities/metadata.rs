use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::event::Event;

/// One value out of an extractor's output. Extractors return loosely shaped
/// data (scalars, arrays of keywords, nested XMP structures); this is the
/// closed set of shapes the gallery walks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<MetadataValue>),
    Map(Vec<(String, MetadataValue)>),
}

impl MetadataValue {
    pub fn text(value: impl Into<String>) -> Self {
        MetadataValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }

    /// Scalar rendering of a leaf, matching how the shell would stringify it.
    /// Containers have no scalar form.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            MetadataValue::Null | MetadataValue::List(_) | MetadataValue::Map(_) => None,
            MetadataValue::Bool(b) => Some(b.to_string()),
            MetadataValue::Number(n) => Some(format_number(*n)),
            MetadataValue::Text(s) => Some(s.clone()),
        }
    }
}

/// Integral floats print without a fractional part (`2024`, not `2024.0`).
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => MetadataValue::Null,
            serde_json::Value::Bool(b) => MetadataValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or(MetadataValue::Null, MetadataValue::Number),
            serde_json::Value::String(s) => MetadataValue::Text(s),
            serde_json::Value::Array(items) => {
                MetadataValue::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => MetadataValue::Map(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Into::into)
    }
}

/// Field name → value mapping for one image, in extractor order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataRecord {
    fields: Vec<(String, MetadataValue)>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: MetadataValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: MetadataValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// First of `names` present with a non-null value.
    pub fn first_present(&self, names: &[&str]) -> Option<&MetadataValue> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.is_null())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for MetadataRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

impl<'de> Deserialize<'de> for MetadataRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Object(map) => Ok(map.into()),
            // exifr resolves to undefined for files without metadata
            serde_json::Value::Null => Ok(Self::default()),
            other => Err(serde::de::Error::custom(format!(
                "expected a metadata object, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataError {
    #[error("metadata extraction is not available in this shell")]
    Unavailable,

    #[error("metadata lookup failed for {address}: {message}")]
    LookupFailed { address: String, message: String },
}

impl MetadataError {
    pub fn lookup_failed(address: impl Into<String>, message: impl Into<String>) -> Self {
        MetadataError::LookupFailed {
            address: address.into(),
            message: message.into(),
        }
    }
}

pub type MetadataResult = Result<MetadataRecord, MetadataError>;

/// Asks the shell's metadata reader (an EXIF/XMP/IPTC parser) for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataOperation {
    Extract { address: String },
}

impl Operation for MetadataOperation {
    type Output = MetadataResult;
}

pub struct Metadata<E> {
    context: CapabilityContext<MetadataOperation, E>,
}

impl<Ev> Capability<Ev> for Metadata<Ev> {
    type Operation = MetadataOperation;
    type MappedSelf<MappedEv> = Metadata<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Metadata::new(self.context.map_event(f))
    }
}

impl<E> Metadata<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<MetadataOperation, E>) -> Self {
        Self { context }
    }

    /// One extraction per call; callers dedupe through the metadata cache.
    pub fn extract<F>(&self, address: impl Into<String>, make_event: F)
    where
        F: FnOnce(MetadataResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        let operation = MetadataOperation::Extract {
            address: address.into(),
        };
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}

pub type MetadataCapability = Metadata<Event>;
