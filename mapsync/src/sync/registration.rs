//! Idempotent source registration.

use super::{SourceSync, SyncState};
use crate::engine::MapEngine;
use crate::error::Result;

impl SourceSync {
    /// Register the managed source if the engine does not have it.
    ///
    /// Does nothing when a source with this id already exists or when no
    /// descriptor is set. Otherwise adds the source, arms the load observer,
    /// moves to [`SyncState::Loading`], and fires `source_added`.
    ///
    /// Returns whether a source was added. Only valid while attached.
    pub fn register<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> Result<bool> {
        self.require(self.state.is_attached(), "register")?;
        let id = self.props.id.as_str();

        if engine.has_source(id) {
            tracing::debug!(source_id = %id, "Source already registered, skipping");
            return Ok(false);
        }
        let Some(descriptor) = self.props.descriptor.as_ref() else {
            tracing::debug!(source_id = %id, "No descriptor, nothing to register");
            return Ok(false);
        };

        engine.add_source(id, descriptor)?;
        tracing::info!(source_id = %id, kind = %descriptor.kind(), "Source registered");

        self.arm_load_observer(engine);
        self.set_state(SyncState::Loading);

        if let Some(handle) = engine.source_handle(&self.props.id) {
            self.observer.source_added(&handle);
        }
        Ok(true)
    }
}
