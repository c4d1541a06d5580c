//! Dependent-layer capture and replay.
//!
//! Recreating a source requires removing every layer that draws from it first.
//! Capture records each such layer together with the id of the layer directly
//! above it, removes the layers and the source, and returns the records topmost
//! first. Replaying that list, inserting each layer below its recorded
//! neighbour, rebuilds the previous stacking: the neighbour of every record has
//! either survived the capture or was replayed before it.

use super::SourceSync;
use crate::engine::{LayerSpec, MapEngine};
use crate::error::Result;

/// A captured layer and its position in the draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct DependentLayer {
    /// The layer definition as the engine reported it.
    pub layer: LayerSpec,
    /// Id of the layer directly above this one at capture time, `None` if it
    /// was topmost.
    pub before: Option<String>,
}

/// Remove the source `id` and every layer drawing from it.
///
/// Returns the removed layers topmost first, ready for [`replay_layers`].
/// When the engine has no such source nothing is removed and the list is
/// empty.
pub fn capture_dependent_layers<E: MapEngine + ?Sized>(
    engine: &mut E,
    id: &str,
) -> Result<Vec<DependentLayer>> {
    if !engine.has_source(id) {
        return Ok(Vec::new());
    }

    let layers = engine.layers();
    let mut captured: Vec<DependentLayer> = layers
        .iter()
        .enumerate()
        .filter(|(_, layer)| layer.reads_from(id))
        .map(|(index, layer)| DependentLayer {
            layer: layer.clone(),
            before: layers.get(index + 1).map(|next| next.id.clone()),
        })
        .collect();

    for dependent in &captured {
        if engine.has_layer(&dependent.layer.id) {
            engine.remove_layer(&dependent.layer.id)?;
        }
    }
    if engine.has_source(id) {
        engine.remove_source(id)?;
    }

    tracing::debug!(source_id = %id, layers = captured.len(), "Captured dependent layers");
    captured.reverse();
    Ok(captured)
}

/// Re-add captured layers in the given order, each below its recorded
/// neighbour. Returns how many layers were added.
///
/// Layers that already exist are skipped. A layer whose neighbour no longer
/// exists is placed on top.
pub fn replay_layers<E: MapEngine + ?Sized>(
    engine: &mut E,
    layers: Vec<DependentLayer>,
) -> Result<usize> {
    let mut restored = 0;

    for DependentLayer { layer, before } in layers {
        if engine.has_layer(&layer.id) {
            tracing::debug!(layer_id = %layer.id, "Layer already present, not replaying");
            continue;
        }

        let anchor = before.as_deref().filter(|b| engine.has_layer(b));
        if let (Some(missing), None) = (before.as_deref(), anchor) {
            tracing::warn!(
                layer_id = %layer.id,
                before = %missing,
                "Recorded neighbour layer is gone, placing layer on top"
            );
        }

        engine.add_layer(layer, anchor)?;
        restored += 1;
    }

    Ok(restored)
}

impl SourceSync {
    /// Capture and remove this component's source and its dependent layers.
    pub fn capture_dependent_layers<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
    ) -> Result<Vec<DependentLayer>> {
        capture_dependent_layers(engine, &self.props.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{SourceDescriptor, TileDescriptor};
    use crate::engine::{EngineCall, MemoryEngine};

    fn tiles() -> SourceDescriptor {
        TileDescriptor::raster_url("mapbox://satellite").into()
    }

    /// background, sat-a, roads, sat-b, sat-c, labels
    fn interleaved_engine() -> MemoryEngine {
        let mut engine = MemoryEngine::new();
        engine.add_source("sat", &tiles()).unwrap();
        engine.add_source("streets", &tiles()).unwrap();
        engine.add_layer(LayerSpec::new("background", "background"), None).unwrap();
        engine.add_layer(LayerSpec::new("sat-a", "raster").with_source("sat"), None).unwrap();
        engine.add_layer(LayerSpec::new("roads", "line").with_source("streets"), None).unwrap();
        engine.add_layer(LayerSpec::new("sat-b", "raster").with_source("sat"), None).unwrap();
        engine.add_layer(LayerSpec::new("sat-c", "raster").with_source("sat"), None).unwrap();
        engine.add_layer(LayerSpec::new("labels", "symbol").with_source("streets"), None).unwrap();
        engine.clear_journal();
        engine
    }

    #[test]
    fn test_capture_records_neighbours_and_reverses() {
        let mut engine = interleaved_engine();

        let captured = capture_dependent_layers(&mut engine, "sat").unwrap();

        let summary: Vec<(&str, Option<&str>)> = captured
            .iter()
            .map(|d| (d.layer.id.as_str(), d.before.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("sat-c", Some("labels")),
                ("sat-b", Some("sat-c")),
                ("sat-a", Some("roads")),
            ]
        );
        assert!(!engine.has_source("sat"));
        assert_eq!(engine.layer_ids(), vec!["background", "roads", "labels"]);
    }

    #[test]
    fn test_capture_then_replay_restores_order() {
        let mut engine = interleaved_engine();
        let before = engine.layer_ids();

        let captured = capture_dependent_layers(&mut engine, "sat").unwrap();
        engine.add_source("sat", &tiles()).unwrap();
        let restored = replay_layers(&mut engine, captured).unwrap();

        assert_eq!(restored, 3);
        assert_eq!(engine.layer_ids(), before);
    }

    #[test]
    fn test_topmost_layer_has_no_neighbour() {
        let mut engine = MemoryEngine::new();
        engine.add_source("sat", &tiles()).unwrap();
        engine.add_layer(LayerSpec::new("a", "raster").with_source("sat"), None).unwrap();
        engine.add_layer(LayerSpec::new("b", "raster").with_source("sat"), None).unwrap();
        engine.add_layer(LayerSpec::new("c", "raster").with_source("sat"), None).unwrap();

        let captured = capture_dependent_layers(&mut engine, "sat").unwrap();
        assert_eq!(captured[0].layer.id, "c");
        assert_eq!(captured[0].before, None);
        assert!(engine.layer_ids().is_empty());

        engine.add_source("sat", &tiles()).unwrap();
        replay_layers(&mut engine, captured).unwrap();
        assert_eq!(engine.layer_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_capture_of_unregistered_source_is_noop() {
        let mut engine = interleaved_engine();

        let captured = capture_dependent_layers(&mut engine, "missing").unwrap();

        assert!(captured.is_empty());
        assert!(engine.journal().is_empty());
    }

    #[test]
    fn test_capture_removes_layers_before_source() {
        let mut engine = interleaved_engine();
        capture_dependent_layers(&mut engine, "sat").unwrap();

        assert_eq!(
            engine.journal().last(),
            Some(&EngineCall::RemoveSource { id: "sat".into() })
        );
        assert_eq!(engine.journal().len(), 4);
    }

    #[test]
    fn test_replay_falls_back_to_top_when_neighbour_missing() {
        let mut engine = interleaved_engine();
        let captured = capture_dependent_layers(&mut engine, "sat").unwrap();

        engine.remove_layer("labels").unwrap();
        engine.add_source("sat", &tiles()).unwrap();
        replay_layers(&mut engine, captured).unwrap();

        assert_eq!(
            engine.layer_ids(),
            vec!["background", "sat-a", "roads", "sat-b", "sat-c"]
        );
    }

    #[test]
    fn test_replay_skips_existing_layers() {
        let mut engine = interleaved_engine();
        let captured = capture_dependent_layers(&mut engine, "sat").unwrap();
        engine.add_source("sat", &tiles()).unwrap();
        engine.add_layer(LayerSpec::new("sat-b", "raster").with_source("sat"), None).unwrap();

        let restored = replay_layers(&mut engine, captured).unwrap();
        assert_eq!(restored, 2);
    }
}
