//! Source synchronization
//!
//! [`SourceSync`] owns one source id in a [`MapEngine`] and keeps the engine's
//! registry consistent with the declared [`SourceProps`]. The host drives it
//! through four entry points:
//!
//! - [`SourceSync::on_attach`]: subscribe to style events, register the source
//! - [`SourceSync::on_props_changed`]: diff old vs. new props, patch or replace
//! - [`SourceSync::on_engine_event`]: load detection and style-reset recovery
//! - [`SourceSync::on_detach`]: remove source and layers, then release subscriptions
//!
//! # Execution Model
//!
//! Everything runs on the caller's thread as a reaction to one of those calls.
//! The engine is borrowed mutably for the duration of each call, so a
//! destructive replace (capture, remove, register, replay) always completes
//! before the next event is looked at.
//!
//! # Failure Model
//!
//! Missing sources and layers are not errors: every mutation checks first and
//! skips what is already gone. Errors returned by the engine itself propagate
//! unchanged as [`SyncError::Engine`].

mod diff;
mod load_observer;
mod observer;
mod preserver;
mod registration;
mod state;
mod style_reset;
mod subscription;

pub use diff::UpdateAction;
pub use load_observer::PendingPatch;
pub use observer::{CallbackObserver, NoopObserver, SourceObserver};
pub use preserver::{capture_dependent_layers, replay_layers, DependentLayer};
pub use state::SyncState;

use crate::config::SyncConfig;
use crate::descriptor::{SourceDescriptor, SourceProps};
use crate::engine::{EngineEvent, EventKind, MapEngine};
use crate::error::{Result, SyncError};
use subscription::Subscriptions;

/// What handling an engine event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not subscribed to this event class; nothing was looked at.
    Ignored,
    /// Subscribed, checked, nothing to do.
    NoChange,
    /// The source finished loading; the loaded notification fired.
    SourceLoaded,
    /// The source was lost and re-registered; the host must re-render this
    /// component's children.
    RedrawRequested,
}

/// Keeps one managed source in sync with a map engine.
pub struct SourceSync {
    props: SourceProps,
    config: SyncConfig,
    observer: Box<dyn SourceObserver>,
    state: SyncState,
    subscriptions: Subscriptions,
    pending: Option<PendingPatch>,
}

impl std::fmt::Debug for SourceSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSync")
            .field("id", &self.props.id)
            .field("kind", &self.props.kind())
            .field("state", &self.state)
            .field("subscriptions", &self.subscriptions)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl SourceSync {
    /// Create an unattached component with no observer.
    pub fn new(props: SourceProps, config: SyncConfig) -> Self {
        Self::with_observer(props, config, NoopObserver)
    }

    /// Create an unattached component reporting to `observer`.
    pub fn with_observer(
        props: SourceProps,
        config: SyncConfig,
        observer: impl SourceObserver + 'static,
    ) -> Self {
        Self {
            props,
            config,
            observer: Box::new(observer),
            state: SyncState::Unattached,
            subscriptions: Subscriptions::default(),
            pending: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.props.id
    }

    pub fn props(&self) -> &SourceProps {
        &self.props
    }

    pub fn descriptor(&self) -> Option<&SourceDescriptor> {
        self.props.descriptor.as_ref()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// The patch waiting for load confirmation, if any.
    pub fn pending_patch(&self) -> Option<&PendingPatch> {
        self.pending.as_ref()
    }

    /// Attach hook. Subscribes to style events and registers the source.
    pub fn on_attach<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> Result<()> {
        self.require(self.state == SyncState::Unattached, "attach")?;

        tracing::debug!(source_id = %self.props.id, kind = ?self.props.kind(), "Attaching source");
        self.subscriptions.subscribe_style(engine);
        self.set_state(SyncState::Registering);
        self.register(engine)?;
        Ok(())
    }

    /// Detach hook. Removes the source and its dependent layers, then releases
    /// all subscriptions. Returns the layers that were removed, topmost first.
    ///
    /// When the engine no longer has a style there is nothing to remove; only
    /// the subscriptions are released. If the engine rejects a removal the
    /// component stays attached and the detach can be retried.
    pub fn on_detach<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Result<Vec<DependentLayer>> {
        self.require(self.state.is_attached(), "detach")?;

        let removed = if engine.has_style() {
            capture_dependent_layers(engine, &self.props.id)?
        } else {
            tracing::debug!(source_id = %self.props.id, "Detaching without style, nothing to remove");
            Vec::new()
        };

        let released = self.subscriptions.release_all(engine);
        self.pending = None;
        self.set_state(SyncState::Detached);
        tracing::info!(
            source_id = %self.props.id,
            released,
            layers_removed = removed.len(),
            "Source detached"
        );
        Ok(removed)
    }

    /// Deliver an engine event. Only event classes this component is currently
    /// subscribed to are acted on.
    pub fn on_engine_event<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        event: &EngineEvent,
    ) -> Result<EventOutcome> {
        let kind = event.kind();
        if !self.state.is_attached() || !self.subscriptions.listens_to(engine, kind) {
            return Ok(EventOutcome::Ignored);
        }

        match kind {
            EventKind::StyleData => self.on_style_data(engine),
            EventKind::SourceData => self.on_source_data(engine),
        }
    }

    fn require(&self, allowed: bool, operation: &'static str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(SyncError::InvalidState {
                id: self.props.id.clone(),
                operation,
                state: self.state,
            })
        }
    }

    fn set_state(&mut self, next: SyncState) {
        debug_assert!(
            self.state.allows(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        if self.state != next {
            tracing::trace!(source_id = %self.props.id, from = %self.state, to = %next, "State transition");
        }
        self.state = next;
    }
}

impl Drop for SourceSync {
    fn drop(&mut self) {
        if self.state.is_attached() && !self.subscriptions.is_empty() {
            tracing::warn!(
                source_id = %self.props.id,
                state = %self.state,
                "SourceSync dropped while attached; engine subscriptions were not released"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TileDescriptor;
    use crate::engine::{EngineError, LayerSpec, MemoryEngine};

    fn tile_sync() -> SourceSync {
        SourceSync::new(
            SourceProps::new("satellite", TileDescriptor::raster_url("mapbox://satellite")),
            SyncConfig::default(),
        )
    }

    #[test]
    fn test_attach_twice_is_invalid() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync();
        sync.on_attach(&mut engine).unwrap();

        let err = sync.on_attach(&mut engine).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidState { operation: "attach", state: SyncState::Loading, .. }
        ));
        assert_eq!(engine.source_count(), 1);
    }

    #[test]
    fn test_detach_before_attach_is_invalid() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync();
        assert!(sync.on_detach(&mut engine).is_err());
    }

    #[test]
    fn test_events_before_attach_are_ignored() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync();
        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);
        assert_eq!(engine.source_count(), 0);
    }

    #[test]
    fn test_detach_without_style_only_releases_subscriptions() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync();
        sync.on_attach(&mut engine).unwrap();
        engine.unload_style();

        let removed = sync.on_detach(&mut engine).unwrap();
        assert!(removed.is_empty());
        assert_eq!(engine.active_subscriptions(), 0);
        assert_eq!(sync.state(), SyncState::Detached);
    }

    #[test]
    fn test_failed_detach_stays_attached_and_can_retry() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync();
        sync.on_attach(&mut engine).unwrap();
        engine
            .add_layer(LayerSpec::new("satellite-raster", "raster").with_source("satellite"), None)
            .unwrap();
        let subscriptions = engine.active_subscriptions();
        engine.fail_next_mutation(EngineError::Backend("context lost".into()));

        let err = sync.on_detach(&mut engine).unwrap_err();
        assert!(matches!(err, SyncError::Engine(EngineError::Backend(_))));
        assert_eq!(sync.state(), SyncState::Loading);
        assert_eq!(engine.active_subscriptions(), subscriptions);
        assert!(engine.has_source("satellite"));

        let removed = sync.on_detach(&mut engine).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(sync.state(), SyncState::Detached);
        assert_eq!(engine.active_subscriptions(), 0);
        assert_eq!(engine.source_count(), 0);
        assert!(engine.layer_ids().is_empty());
    }

    #[test]
    fn test_attach_without_descriptor_stays_registering() {
        let mut engine = MemoryEngine::new();
        let mut sync = SourceSync::new(SourceProps::empty("later"), SyncConfig::default());
        sync.on_attach(&mut engine).unwrap();

        assert_eq!(sync.state(), SyncState::Registering);
        assert_eq!(engine.source_count(), 0);
        assert_eq!(engine.subscriptions_of(EventKind::StyleData), 1);
        assert_eq!(engine.subscriptions_of(EventKind::SourceData), 0);
    }
}
