//! In-memory map engine.
//!
//! `MemoryEngine` keeps a source registry, an ordered layer stack, and a
//! subscription ledger, and enforces the same registry rules a real engine does
//! (no duplicate ids, no removing a source that layers still use, no layers on
//! missing sources). Loading never completes on its own: drive it with
//! [`MemoryEngine::mark_source_loaded`]. Every mutation is recorded in a
//! journal so tests can assert exact call sequences.

use std::collections::{BTreeMap, VecDeque};

use super::{
    EngineError, EngineEvent, EventKind, LayerSpec, MapEngine, SourceHandle, SubscriptionId,
};
use crate::descriptor::{GeoPointsData, ImageCoordinates, SourceDescriptor, SourceKind};

/// One mutating call received by a [`MemoryEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    AddSource { id: String, kind: SourceKind },
    RemoveSource { id: String },
    AddLayer { id: String, before: Option<String> },
    RemoveLayer { id: String },
    SetData { id: String },
    SetCoordinates { id: String },
}

#[derive(Debug, Clone)]
struct SourceEntry {
    descriptor: SourceDescriptor,
    loaded: bool,
    data: Option<GeoPointsData>,
    coordinates: Option<ImageCoordinates>,
}

/// A complete engine living in memory.
#[derive(Debug)]
pub struct MemoryEngine {
    style_loaded: bool,
    sources: BTreeMap<String, SourceEntry>,
    layers: Vec<LayerSpec>,
    subscriptions: BTreeMap<SubscriptionId, EventKind>,
    next_subscription: u64,
    events: VecDeque<EngineEvent>,
    journal: Vec<EngineCall>,
    injected_failure: Option<EngineError>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Engine with an empty, loaded style.
    pub fn new() -> Self {
        Self {
            style_loaded: true,
            sources: BTreeMap::new(),
            layers: Vec::new(),
            subscriptions: BTreeMap::new(),
            next_subscription: 1,
            events: VecDeque::new(),
            journal: Vec::new(),
            injected_failure: None,
        }
    }

    /// Wipe every source and layer, as a full style reload does, and announce
    /// it with a style event. Subscriptions survive.
    pub fn reset_style(&mut self) {
        tracing::debug!(
            sources = self.sources.len(),
            layers = self.layers.len(),
            "Memory engine: style reset"
        );
        self.sources.clear();
        self.layers.clear();
        self.style_loaded = true;
        self.events.push_back(EngineEvent::StyleData);
    }

    /// Drop the style entirely, as an engine being torn down does.
    pub fn unload_style(&mut self) {
        self.sources.clear();
        self.layers.clear();
        self.style_loaded = false;
    }

    /// Finish loading a source and emit a source data event.
    ///
    /// Returns `false` when no such source exists.
    pub fn mark_source_loaded(&mut self, id: &str) -> bool {
        match self.sources.get_mut(id) {
            Some(entry) => {
                entry.loaded = true;
                self.events.push_back(EngineEvent::SourceData {
                    source_id: Some(id.to_string()),
                });
                true
            }
            None => false,
        }
    }

    /// Finish loading every registered source.
    pub fn mark_all_loaded(&mut self) {
        let ids: Vec<String> = self.sources.keys().cloned().collect();
        for id in ids {
            self.mark_source_loaded(&id);
        }
    }

    /// Queue an arbitrary event.
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push_back(event);
    }

    /// Drain queued events in emission order.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Mutating calls received so far.
    pub fn journal(&self) -> &[EngineCall] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Make the next registry mutation fail with `error` without applying it.
    pub fn fail_next_mutation(&mut self, error: EngineError) {
        self.injected_failure = Some(error);
    }

    fn check_injected_failure(&mut self) -> Result<(), EngineError> {
        match self.injected_failure.take() {
            Some(error) => {
                tracing::debug!(error = %error, "Memory engine: injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    /// Layer ids in draw order, bottom first.
    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn source_descriptor(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.get(id).map(|e| &e.descriptor)
    }

    /// Current feature data of a geo-points source.
    pub fn source_data(&self, id: &str) -> Option<&GeoPointsData> {
        self.sources.get(id).and_then(|e| e.data.as_ref())
    }

    /// Current corners of an image source.
    pub fn source_coordinates(&self, id: &str) -> Option<&ImageCoordinates> {
        self.sources.get(id).and_then(|e| e.coordinates.as_ref())
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn subscriptions_of(&self, kind: EventKind) -> usize {
        self.subscriptions.values().filter(|k| **k == kind).count()
    }

    fn ensure_style(&self) -> Result<(), EngineError> {
        if self.style_loaded {
            Ok(())
        } else {
            Err(EngineError::StyleNotLoaded)
        }
    }

    fn entry_mut(&mut self, id: &str, expected: SourceKind) -> Result<&mut SourceEntry, EngineError> {
        let entry = self
            .sources
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        let actual = entry.descriptor.kind();
        if actual != expected {
            return Err(EngineError::WrongSourceKind {
                id: id.to_string(),
                expected,
                actual,
            });
        }
        Ok(entry)
    }
}

impl MapEngine for MemoryEngine {
    fn has_style(&self) -> bool {
        self.style_loaded
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn is_source_loaded(&self, id: &str) -> bool {
        self.sources.get(id).is_some_and(|e| e.loaded)
    }

    fn layers(&self) -> Vec<LayerSpec> {
        self.layers.clone()
    }

    fn source_handle(&self, id: &str) -> Option<SourceHandle> {
        self.sources.get(id).map(|e| SourceHandle {
            id: id.to_string(),
            kind: e.descriptor.kind(),
        })
    }

    fn add_source(&mut self, id: &str, descriptor: &SourceDescriptor) -> Result<(), EngineError> {
        self.check_injected_failure()?;
        self.ensure_style()?;
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }

        let data = descriptor.post_load_data().map(|d| (**d).clone());
        let coordinates = descriptor.post_load_coordinates().map(|c| **c);
        self.sources.insert(
            id.to_string(),
            SourceEntry {
                descriptor: descriptor.clone(),
                loaded: false,
                data,
                coordinates,
            },
        );
        self.journal.push(EngineCall::AddSource {
            id: id.to_string(),
            kind: descriptor.kind(),
        });
        self.events.push_back(EngineEvent::SourceData {
            source_id: Some(id.to_string()),
        });
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        self.check_injected_failure()?;
        if !self.sources.contains_key(id) {
            return Err(EngineError::UnknownSource(id.to_string()));
        }
        if let Some(layer) = self.layers.iter().find(|l| l.reads_from(id)) {
            return Err(EngineError::SourceInUse {
                source_id: id.to_string(),
                layer_id: layer.id.clone(),
            });
        }

        self.sources.remove(id);
        self.journal.push(EngineCall::RemoveSource { id: id.to_string() });
        self.events.push_back(EngineEvent::StyleData);
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), EngineError> {
        self.check_injected_failure()?;
        self.ensure_style()?;
        if self.has_layer(&layer.id) {
            return Err(EngineError::DuplicateLayer(layer.id));
        }
        if let Some(source) = layer.source.as_deref() {
            if !self.sources.contains_key(source) {
                return Err(EngineError::UnknownSource(source.to_string()));
            }
        }

        let index = match before {
            Some(before_id) => self
                .layers
                .iter()
                .position(|l| l.id == before_id)
                .ok_or_else(|| EngineError::UnknownLayer(before_id.to_string()))?,
            None => self.layers.len(),
        };

        self.journal.push(EngineCall::AddLayer {
            id: layer.id.clone(),
            before: before.map(str::to_string),
        });
        self.layers.insert(index, layer);
        self.events.push_back(EngineEvent::StyleData);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        self.check_injected_failure()?;
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))?;

        self.layers.remove(index);
        self.journal.push(EngineCall::RemoveLayer { id: id.to_string() });
        self.events.push_back(EngineEvent::StyleData);
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: &GeoPointsData) -> Result<(), EngineError> {
        self.check_injected_failure()?;
        let entry = self.entry_mut(id, SourceKind::GeoPoints)?;
        entry.data = Some(data.clone());
        self.journal.push(EngineCall::SetData { id: id.to_string() });
        self.events.push_back(EngineEvent::SourceData {
            source_id: Some(id.to_string()),
        });
        Ok(())
    }

    fn set_source_coordinates(
        &mut self,
        id: &str,
        coordinates: &ImageCoordinates,
    ) -> Result<(), EngineError> {
        self.check_injected_failure()?;
        let entry = self.entry_mut(id, SourceKind::Image)?;
        entry.coordinates = Some(*coordinates);
        self.journal.push(EngineCall::SetCoordinates { id: id.to_string() });
        self.events.push_back(EngineEvent::SourceData {
            source_id: Some(id.to_string()),
        });
        Ok(())
    }

    fn subscribe(&mut self, kind: EventKind) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, kind);
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.subscriptions.remove(&subscription).is_some()
    }

    fn is_subscribed(&self, subscription: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&subscription)
    }
}
