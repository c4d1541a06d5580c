//! Recovery from engine-side style resets.

use super::{EventOutcome, SourceSync, SyncState};
use crate::config::ResetProbe;
use crate::engine::MapEngine;
use crate::error::Result;

impl SourceSync {
    /// Whether the engine has lost everything registered under our id.
    fn is_lost<E: MapEngine + ?Sized>(&self, engine: &E) -> bool {
        let id = self.props.id.as_str();
        match self.config.reset_probe {
            ResetProbe::AnyEntity => !engine.has_source(id) && !engine.has_layer(id),
            ResetProbe::LayerOnly => !engine.has_layer(id),
        }
    }

    pub(super) fn on_style_data<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Result<EventOutcome> {
        if !self.is_lost(engine) {
            return Ok(EventOutcome::NoChange);
        }

        if !engine.has_source(&self.props.id) {
            self.set_state(SyncState::Registering);
        }
        let registered = self.register(engine)?;
        tracing::info!(
            source_id = %self.props.id,
            registered,
            "Managed source missing after style change, requesting redraw"
        );
        Ok(EventOutcome::RedrawRequested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::descriptor::{SourceProps, TileDescriptor};
    use crate::engine::{EngineEvent, LayerSpec, MemoryEngine};
    use crate::sync::SourceSync;

    fn tile_sync(config: SyncConfig) -> SourceSync {
        SourceSync::new(
            SourceProps::new("satellite", TileDescriptor::raster_url("mapbox://satellite")),
            config,
        )
    }

    #[test]
    fn test_any_entity_ignores_style_event_with_source_present() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync(SyncConfig::default().with_reset_probe(ResetProbe::AnyEntity));
        sync.on_attach(&mut engine).unwrap();
        engine.clear_journal();

        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();
        assert_eq!(outcome, EventOutcome::NoChange);
        assert!(engine.journal().is_empty());
    }

    #[test]
    fn test_default_redraws_when_layers_dropped_but_source_kept() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync(SyncConfig::default());
        sync.on_attach(&mut engine).unwrap();
        engine
            .add_layer(LayerSpec::new("satellite-raster", "raster").with_source("satellite"), None)
            .unwrap();
        engine.remove_layer("satellite-raster").unwrap();
        engine.clear_journal();

        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();

        // Registration is a no-op while the source survives; only the redraw remains
        assert_eq!(outcome, EventOutcome::RedrawRequested);
        assert!(engine.journal().is_empty());
        assert_eq!(engine.source_count(), 1);
        assert_eq!(sync.state(), SyncState::Loading);
    }

    #[test]
    fn test_reset_reregisters_and_requests_redraw() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync(SyncConfig::default());
        sync.on_attach(&mut engine).unwrap();
        engine.mark_source_loaded("satellite");
        sync.on_engine_event(&mut engine, &EngineEvent::SourceData { source_id: None })
            .unwrap();
        assert_eq!(sync.state(), SyncState::Loaded);

        engine.reset_style();
        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();

        assert_eq!(outcome, EventOutcome::RedrawRequested);
        assert!(engine.has_source("satellite"));
        assert_eq!(engine.source_count(), 1);
        assert_eq!(sync.state(), SyncState::Loading);
    }

    #[test]
    fn test_layer_only_redraws_when_no_layer_matches_id() {
        let mut engine = MemoryEngine::new();
        let mut sync = tile_sync(SyncConfig::default().with_reset_probe(ResetProbe::LayerOnly));
        sync.on_attach(&mut engine).unwrap();
        engine
            .add_layer(LayerSpec::new("satellite-raster", "raster").with_source("satellite"), None)
            .unwrap();
        engine.clear_journal();

        // Source is still there, but no layer is named after it
        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();
        assert_eq!(outcome, EventOutcome::RedrawRequested);
        assert!(engine.journal().is_empty());
        assert_eq!(sync.state(), SyncState::Loading);

        engine
            .add_layer(LayerSpec::new("satellite", "raster").with_source("satellite"), None)
            .unwrap();
        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();
        assert_eq!(outcome, EventOutcome::NoChange);
    }

    #[test]
    fn test_reset_without_descriptor_still_requests_redraw() {
        let mut engine = MemoryEngine::new();
        let mut sync = SourceSync::new(SourceProps::empty("later"), SyncConfig::default());
        sync.on_attach(&mut engine).unwrap();

        let outcome = sync.on_engine_event(&mut engine, &EngineEvent::StyleData).unwrap();
        assert_eq!(outcome, EventOutcome::RedrawRequested);
        assert_eq!(engine.source_count(), 0);
        assert_eq!(sync.state(), SyncState::Registering);
    }
}
