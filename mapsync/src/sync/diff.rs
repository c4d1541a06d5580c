//! Property-update reconciliation.
//!
//! On every props change the old and new descriptors are compared and exactly
//! one of three strategies runs, chosen by the variant the component was built
//! with:
//!
//! | Variant    | Trigger                                          | Action               |
//! |------------|--------------------------------------------------|----------------------|
//! | Tiles      | url, tile list identity, minzoom, maxzoom differ | destructive replace  |
//! | Geo points | new data `Arc`, defined, source registered       | in-place data patch  |
//! | Image      | new coordinates `Arc`, source registered         | in-place coord patch |
//!
//! A replace captures the dependent layers (removing them and the source),
//! registers the new source under the same id, and replays the layers.

use std::fmt;
use std::sync::Arc;

use super::{replay_layers, PendingPatch, SourceSync, SyncState};
use crate::descriptor::{
    GeoPointsDescriptor, ImageDescriptor, SourceDescriptor, SourceProps, TileDescriptor,
};
use crate::engine::MapEngine;
use crate::error::{Result, SyncError};

/// What a props update did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// Nothing relevant changed.
    None,
    /// A descriptor arrived for a component that had none; the source was
    /// registered.
    Registered,
    /// New feature data was pushed into the existing source.
    PatchedData,
    /// New corner coordinates were pushed into the existing image source.
    PatchedCoordinates,
    /// The source was recreated and its dependent layers replayed.
    Replaced { layers_restored: usize },
    /// The payload changed but the engine has no source to patch. Recovery is
    /// left to the style-reset detector.
    SkippedUnregistered,
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateAction::None => f.write_str("none"),
            UpdateAction::Registered => f.write_str("registered"),
            UpdateAction::PatchedData => f.write_str("patched data"),
            UpdateAction::PatchedCoordinates => f.write_str("patched coordinates"),
            UpdateAction::Replaced { layers_restored } => {
                write!(f, "replaced ({} layers restored)", layers_restored)
            }
            UpdateAction::SkippedUnregistered => f.write_str("skipped, source not registered"),
        }
    }
}

/// Whether an optional `Arc` payload moved to a different allocation that is
/// present.
fn changed_to_new<T: ?Sized>(old: &Option<Arc<T>>, new: &Option<Arc<T>>) -> bool {
    match (old, new) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
    }
}

impl SourceSync {
    /// Update hook. Reconciles the engine with `next` and adopts it.
    ///
    /// Fails without touching anything when `next` changes the id or switches
    /// the descriptor variant. Before attach the props are only stored.
    pub fn on_props_changed<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        next: SourceProps,
    ) -> Result<UpdateAction> {
        if next.id != self.props.id {
            return Err(SyncError::IdChanged {
                current: self.props.id.clone(),
                requested: next.id,
            });
        }
        if let (Some(current), Some(requested)) = (self.props.kind(), next.kind()) {
            if current != requested {
                return Err(SyncError::VariantChanged {
                    id: next.id,
                    current,
                    requested,
                });
            }
        }
        self.require(self.state != SyncState::Detached, "update")?;

        let previous = std::mem::replace(&mut self.props, next);
        if !self.state.is_attached() {
            return Ok(UpdateAction::None);
        }

        let action = match (previous.descriptor.as_ref(), self.props.descriptor.clone()) {
            (None, Some(_)) => {
                if self.register(engine)? {
                    UpdateAction::Registered
                } else {
                    UpdateAction::None
                }
            }
            (Some(SourceDescriptor::Tiles(old)), Some(SourceDescriptor::Tiles(new))) => {
                self.update_tiles(engine, old, &new)?
            }
            (Some(SourceDescriptor::GeoPoints(old)), Some(SourceDescriptor::GeoPoints(new))) => {
                self.update_geo_points(engine, old, &new)?
            }
            (Some(SourceDescriptor::Image(old)), Some(SourceDescriptor::Image(new))) => {
                self.update_image(engine, old, &new)?
            }
            _ => UpdateAction::None,
        };

        if action != UpdateAction::None {
            tracing::debug!(source_id = %self.props.id, action = %action, "Props reconciled");
        }
        Ok(action)
    }

    fn update_tiles<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        old: &TileDescriptor,
        new: &TileDescriptor,
    ) -> Result<UpdateAction> {
        if !old.needs_replace(new) {
            return Ok(UpdateAction::None);
        }

        tracing::info!(
            source_id = %self.props.id,
            old_url = ?old.url,
            new_url = ?new.url,
            minzoom = ?new.minzoom,
            maxzoom = ?new.maxzoom,
            "Tile source parameters changed, replacing source"
        );

        let layers = self.capture_dependent_layers(engine)?;
        self.register(engine)?;
        let layers_restored = replay_layers(engine, layers)?;

        Ok(UpdateAction::Replaced { layers_restored })
    }

    fn update_geo_points<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        old: &GeoPointsDescriptor,
        new: &GeoPointsDescriptor,
    ) -> Result<UpdateAction> {
        if !changed_to_new(&old.data, &new.data) {
            return Ok(UpdateAction::None);
        }
        let Some(data) = new.data.as_ref().filter(|d| d.is_defined()) else {
            return Ok(UpdateAction::None);
        };
        if !engine.has_source(&self.props.id) {
            tracing::debug!(source_id = %self.props.id, "Data changed but source is not registered");
            return Ok(UpdateAction::SkippedUnregistered);
        }

        engine.set_source_data(&self.props.id, data)?;
        self.refresh_pending(PendingPatch::Data(Arc::clone(data)));
        Ok(UpdateAction::PatchedData)
    }

    fn update_image<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        old: &ImageDescriptor,
        new: &ImageDescriptor,
    ) -> Result<UpdateAction> {
        if !changed_to_new(&old.coordinates, &new.coordinates) {
            return Ok(UpdateAction::None);
        }
        let Some(coordinates) = new.coordinates.as_ref() else {
            return Ok(UpdateAction::None);
        };
        if !engine.has_source(&self.props.id) {
            tracing::debug!(source_id = %self.props.id, "Coordinates changed but source is not registered");
            return Ok(UpdateAction::SkippedUnregistered);
        }

        engine.set_source_coordinates(&self.props.id, coordinates)?;
        self.refresh_pending(PendingPatch::Coordinates(Arc::clone(coordinates)));
        Ok(UpdateAction::PatchedCoordinates)
    }
}
