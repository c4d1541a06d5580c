//! One-shot load detection and post-load payload reapplication.
//!
//! Engines report loading through a stream of source data events; a source may
//! produce many before it is fully loaded, and events for unrelated sources
//! arrive on the same stream. The observer queries the engine on each event and
//! fires once, the first time the managed source is present and loaded.
//!
//! Some engines drop the data or coordinates passed at construction. After the
//! loaded notification the pending payload is pushed into the source again.

use std::sync::Arc;

use super::{EventOutcome, SourceSync, SyncState};
use crate::descriptor::{GeoPointsData, ImageCoordinates, SourceDescriptor};
use crate::engine::MapEngine;
use crate::error::Result;

/// Payload to push into the source once it has loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingPatch {
    Data(Arc<GeoPointsData>),
    Coordinates(Arc<ImageCoordinates>),
}

impl PendingPatch {
    /// The post-load patch implied by a descriptor, if it carries one.
    pub fn for_descriptor(descriptor: &SourceDescriptor) -> Option<Self> {
        if let Some(data) = descriptor.post_load_data() {
            return Some(PendingPatch::Data(Arc::clone(data)));
        }
        descriptor
            .post_load_coordinates()
            .map(|coords| PendingPatch::Coordinates(Arc::clone(coords)))
    }

    fn apply<E: MapEngine + ?Sized>(&self, engine: &mut E, id: &str) -> Result<()> {
        match self {
            PendingPatch::Data(data) => engine.set_source_data(id, data)?,
            PendingPatch::Coordinates(coords) => engine.set_source_coordinates(id, coords)?,
        }
        Ok(())
    }
}

impl SourceSync {
    /// Subscribe to source data events (once) and record the post-load patch
    /// for the current descriptor.
    pub(super) fn arm_load_observer<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        if !self.subscriptions.arm_load(engine) {
            tracing::debug!(source_id = %self.props.id, "Load observer already armed");
        }
        self.pending = if self.config.reapply_after_load {
            self.props
                .descriptor
                .as_ref()
                .and_then(PendingPatch::for_descriptor)
        } else {
            None
        };
    }

    /// Replace the pending patch while the load observer is still waiting.
    pub(super) fn refresh_pending(&mut self, patch: PendingPatch) {
        if self.pending.is_some() && self.config.reapply_after_load {
            self.pending = Some(patch);
        }
    }

    pub(super) fn on_source_data<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Result<EventOutcome> {
        let id = self.props.id.as_str();
        if !engine.has_source(id) || !engine.is_source_loaded(id) {
            return Ok(EventOutcome::NoChange);
        }

        self.subscriptions.disarm_load(engine);
        self.set_state(SyncState::Loaded);
        tracing::info!(source_id = %self.props.id, "Source loaded");

        if let Some(handle) = engine.source_handle(&self.props.id) {
            self.observer.source_loaded(&handle);
        }

        if let Some(patch) = self.pending.take() {
            tracing::debug!(source_id = %self.props.id, patch = ?patch, "Reapplying payload after load");
            patch.apply(engine, &self.props.id)?;
        }

        Ok(EventOutcome::SourceLoaded)
    }
}
