//! Domain types shared by the index, the store and the service surface.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type DocumentId = String;
pub type Metadata = IndexMap<String, MetaValue>;

/// A scalar metadata value.
///
/// Serialized untagged, so a document's metadata reads and writes as plain
/// JSON scalars. Integers and floats are kept apart so a persisted corpus
/// reloads with the same variants it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<f64> for MetaValue {
    fn from(f: f64) -> Self {
        MetaValue::Float(f)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

/// Optional coordinates; either half may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat: Some(lat), lon: Some(lon) }
    }

    pub fn is_complete(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// A retrievable record.
///
/// - `id`: unique within a store; `"<category>_<row_index>"` when built with [`Document::from_row`]
/// - `category`: tag used for post-filtering
/// - `text`: the payload handed to the embedder and returned to callers
/// - `metadata`: source fields, preserved verbatim
/// - `location`: optional coordinates for map features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub category: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub location: Location,
}

impl Document {
    pub fn new(id: impl Into<String>, category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            text: text.into(),
            metadata: Metadata::new(),
            location: Location::default(),
        }
    }

    /// Document for the `row_index`-th row of a category's source table.
    pub fn from_row(category: &str, row_index: usize, text: impl Into<String>) -> Self {
        Self::new(format!("{category}_{row_index}"), category, text)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// One raw ANN result: a vector id and its squared Euclidean distance to the
/// query. Lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: usize,
    pub distance: f32,
}

/// A resolved result returned by the query service.
///
/// `score` is the squared Euclidean distance; lower is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: DocumentId,
    pub category: String,
    pub text: String,
    pub score: f32,
    pub metadata: Metadata,
    pub location: Location,
}

impl SearchResult {
    pub fn from_document(doc: &Document, score: f32) -> Self {
        Self {
            id: doc.id.clone(),
            category: doc.category.clone(),
            text: doc.text.clone(),
            score,
            metadata: doc.metadata.clone(),
            location: doc.location,
        }
    }
}
