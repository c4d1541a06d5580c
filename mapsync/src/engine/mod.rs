//! Map engine abstraction
//!
//! [`MapEngine`] is the contract mapsync needs from a stateful rendering engine:
//! queries against its source/layer registry, mutations of that registry, and
//! event subscriptions. The engine is the source of truth; it may clear its
//! registry at any time (a style reload), and mapsync reconciles afterwards.
//!
//! # Events
//!
//! Engines announce changes through two event classes:
//!
//! - **Style data**: any style mutation, including full reloads
//! - **Source data**: repeated during a source's load and update lifecycle
//!
//! A component subscribes via [`MapEngine::subscribe`] and holds the returned
//! [`SubscriptionId`]. The host delivers events to components; a component
//! reacts only while its own subscription for that event class is live.

mod memory;
mod types;

pub use memory::{EngineCall, MemoryEngine};
pub use types::{EngineError, LayerSpec, SourceHandle};

use std::fmt;

use crate::descriptor::{GeoPointsData, ImageCoordinates, SourceDescriptor};

/// Event classes an engine can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    StyleData,
    SourceData,
}

/// An event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The style changed (layer added/removed, full reload, ...).
    StyleData,
    /// Some source's data changed. `source_id` is informational; listeners
    /// must query the engine rather than trust it.
    SourceData { source_id: Option<String> },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::StyleData => EventKind::StyleData,
            EngineEvent::SourceData { .. } => EventKind::SourceData,
        }
    }
}

/// Opaque handle for an engine event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// A stateful map rendering engine.
///
/// Layer order is bottom to top: the last element of [`MapEngine::layers`] is
/// drawn over everything else.
pub trait MapEngine {
    /// Whether the engine currently has a style at all. Engines being torn
    /// down report `false`.
    fn has_style(&self) -> bool {
        true
    }

    fn has_source(&self, id: &str) -> bool;

    fn has_layer(&self, id: &str) -> bool;

    /// Whether the source exists and all of its data has finished loading.
    fn is_source_loaded(&self, id: &str) -> bool;

    /// All layers of the current style in draw order.
    fn layers(&self) -> Vec<LayerSpec>;

    /// Handle for a registered source, `None` when absent.
    fn source_handle(&self, id: &str) -> Option<SourceHandle>;

    /// Register a new source. Fails if the id is taken.
    fn add_source(&mut self, id: &str, descriptor: &SourceDescriptor) -> Result<(), EngineError>;

    /// Remove a source. Fails while layers still draw from it.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// Insert a layer directly below `before`, or on top when `before` is `None`.
    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), EngineError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    /// Replace the feature data of a geo-points source.
    fn set_source_data(&mut self, id: &str, data: &GeoPointsData) -> Result<(), EngineError>;

    /// Replace the corner coordinates of an image source.
    fn set_source_coordinates(
        &mut self,
        id: &str,
        coordinates: &ImageCoordinates,
    ) -> Result<(), EngineError>;

    fn subscribe(&mut self, kind: EventKind) -> SubscriptionId;

    /// Cancel a subscription. Returns `false` if it was not live.
    fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool;

    fn is_subscribed(&self, subscription: SubscriptionId) -> bool;
}
