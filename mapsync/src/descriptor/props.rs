//! Host-facing properties of a managed source.

use serde::{Deserialize, Serialize};

use super::{
    GeoPointsDescriptor, ImageDescriptor, SourceDescriptor, SourceKind, TileDescriptor,
};
use crate::config::VariantPolicy;
use crate::error::{Result, SyncError};

/// The declared state of one managed source, as handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProps {
    /// Engine id of the source. Stable for the component's lifetime.
    pub id: String,

    /// The active descriptor. `None` means "nothing to register yet".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<SourceDescriptor>,
}

impl SourceProps {
    pub fn new(id: impl Into<String>, descriptor: impl Into<SourceDescriptor>) -> Self {
        Self {
            id: id.into(),
            descriptor: Some(descriptor.into()),
        }
    }

    /// Props with no descriptor; registration is a no-op until one arrives.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            descriptor: None,
        }
    }

    /// Build props from the three optional variant slots some hosts expose.
    ///
    /// With [`VariantPolicy::Reject`] more than one populated slot is an error.
    /// With [`VariantPolicy::Precedence`] the first populated slot in the order
    /// geo-points, tiles, image wins and the rest are dropped with a warning.
    pub fn from_variants(
        id: impl Into<String>,
        geo_points: Option<GeoPointsDescriptor>,
        tiles: Option<TileDescriptor>,
        image: Option<ImageDescriptor>,
        policy: VariantPolicy,
    ) -> Result<Self> {
        let id = id.into();

        let mut present = Vec::new();
        if geo_points.is_some() {
            present.push(SourceKind::GeoPoints);
        }
        if tiles.is_some() {
            present.push(SourceKind::Tiles);
        }
        if image.is_some() {
            present.push(SourceKind::Image);
        }

        if present.len() > 1 {
            match policy {
                VariantPolicy::Reject => {
                    return Err(SyncError::MalformedDescriptor {
                        id,
                        variants: present,
                    });
                }
                VariantPolicy::Precedence => {
                    tracing::warn!(
                        source_id = %id,
                        variants = ?present,
                        winner = %present[0],
                        "Multiple source variants supplied, using precedence order"
                    );
                }
            }
        }

        let descriptor = geo_points
            .map(SourceDescriptor::GeoPoints)
            .or_else(|| tiles.map(SourceDescriptor::Tiles))
            .or_else(|| image.map(SourceDescriptor::Image));

        Ok(Self { id, descriptor })
    }

    /// Variant of the active descriptor, if any.
    pub fn kind(&self) -> Option<SourceKind> {
        self.descriptor.as_ref().map(SourceDescriptor::kind)
    }
}
