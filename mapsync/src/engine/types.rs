//! Value types exchanged with a map engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::descriptor::SourceKind;

/// A style layer as the engine reports it.
///
/// Only `id` and `source` matter to synchronization; everything else is carried
/// through opaquely so that a captured layer can be re-added verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub id: String,

    /// Layer type (`fill`, `line`, `symbol`, `raster`, ...).
    #[serde(rename = "type")]
    pub layer_type: String,

    /// Id of the source this layer draws from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Remaining layer definition (paint, layout, filter, source-layer, ...).
    #[serde(flatten)]
    pub definition: Map<String, Value>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, layer_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer_type: layer_type.into(),
            source: None,
            definition: Map::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.definition.insert(key.into(), value);
        self
    }

    /// Whether this layer reads from the source with the given id.
    pub fn reads_from(&self, source_id: &str) -> bool {
        self.source.as_deref() == Some(source_id)
    }
}

/// Handle to a registered source, delivered with added/loaded notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    pub id: String,
    pub kind: SourceKind,
}

/// Errors reported by a map engine.
///
/// These are never produced by mapsync itself; they are forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Mutation attempted before the engine has a style.
    #[error("Style is not done loading")]
    StyleNotLoaded,

    #[error("There is already a source with id '{0}'")]
    DuplicateSource(String),

    #[error("Source '{0}' does not exist")]
    UnknownSource(String),

    #[error("Layer with id '{0}' already exists on this map")]
    DuplicateLayer(String),

    #[error("Layer with id '{0}' does not exist on this map")]
    UnknownLayer(String),

    /// A source cannot be removed while a layer still draws from it.
    #[error("Source '{source_id}' cannot be removed while layer '{layer_id}' is using it")]
    SourceInUse { source_id: String, layer_id: String },

    /// Data or coordinates pushed into a source of another kind.
    #[error("Source '{id}' is a {actual} source, expected {expected}")]
    WrongSourceKind {
        id: String,
        expected: SourceKind,
        actual: SourceKind,
    },

    /// Engine-specific failure (invalid geometry, bad URL, ...).
    #[error("Engine error: {0}")]
    Backend(String),
}
