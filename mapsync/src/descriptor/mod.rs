//! Source descriptors
//!
//! A descriptor is the declarative side of a managed source: what the host wants
//! the engine to hold under a given id. Exactly one of three variants is active
//! per source, expressed as the [`SourceDescriptor`] sum type.
//!
//! # Identity
//!
//! Payloads that may be large (inline feature data, tile lists, image corner
//! coordinates) are held behind `Arc`. Update detection compares those by
//! pointer identity, not by value: a host that wants an update must hand over a
//! new allocation, and handing back the same `Arc` is always a no-op.

mod props;
mod types;

pub use props::SourceProps;
pub use types::{
    GeoPointsData, GeoPointsDescriptor, ImageCoordinates, ImageDescriptor, TileDescriptor,
    TileKind,
};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Which of the three descriptor variants a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Inline or URL-referenced feature data.
    GeoPoints,
    /// A single georeferenced image.
    Image,
    /// Raster or vector tiles.
    Tiles,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::GeoPoints => "geo-points",
            SourceKind::Image => "image",
            SourceKind::Tiles => "tiles",
        };
        f.write_str(name)
    }
}

/// The declarative description of a managed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    GeoPoints(GeoPointsDescriptor),
    Image(ImageDescriptor),
    Tiles(TileDescriptor),
}

impl SourceDescriptor {
    /// The variant of this descriptor.
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDescriptor::GeoPoints(_) => SourceKind::GeoPoints,
            SourceDescriptor::Image(_) => SourceKind::Image,
            SourceDescriptor::Tiles(_) => SourceKind::Tiles,
        }
    }

    /// Inline data that should be pushed into the source after it loads.
    pub fn post_load_data(&self) -> Option<&Arc<GeoPointsData>> {
        match self {
            SourceDescriptor::GeoPoints(geo) => geo.data.as_ref().filter(|d| d.is_defined()),
            _ => None,
        }
    }

    /// Image corners that should be pushed into the source after it loads.
    pub fn post_load_coordinates(&self) -> Option<&Arc<ImageCoordinates>> {
        match self {
            SourceDescriptor::Image(image) => image.coordinates.as_ref(),
            _ => None,
        }
    }
}

impl From<GeoPointsDescriptor> for SourceDescriptor {
    fn from(descriptor: GeoPointsDescriptor) -> Self {
        SourceDescriptor::GeoPoints(descriptor)
    }
}

impl From<ImageDescriptor> for SourceDescriptor {
    fn from(descriptor: ImageDescriptor) -> Self {
        SourceDescriptor::Image(descriptor)
    }
}

impl From<TileDescriptor> for SourceDescriptor {
    fn from(descriptor: TileDescriptor) -> Self {
        SourceDescriptor::Tiles(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_matches_variant() {
        let geo: SourceDescriptor = GeoPointsDescriptor::inline(json!({"type": "FeatureCollection"})).into();
        let tiles: SourceDescriptor = TileDescriptor::raster_url("mapbox://streets").into();
        assert_eq!(geo.kind(), SourceKind::GeoPoints);
        assert_eq!(tiles.kind(), SourceKind::Tiles);
    }

    #[test]
    fn test_post_load_data_skips_undefined_payloads() {
        let empty_url: SourceDescriptor =
            GeoPointsDescriptor::with_data(GeoPointsData::Url(String::new())).into();
        assert!(empty_url.post_load_data().is_none());

        let inline: SourceDescriptor = GeoPointsDescriptor::inline(json!({"type": "FeatureCollection"})).into();
        assert!(inline.post_load_data().is_some());
        assert!(inline.post_load_coordinates().is_none());
    }

    #[test]
    fn test_descriptor_json_is_tagged() {
        let descriptor: SourceDescriptor = serde_json::from_value(json!({
            "type": "tiles",
            "kind": "vector",
            "url": "mapbox://mapbox.mapbox-streets-v8",
            "maxzoom": 14
        }))
        .unwrap();

        match descriptor {
            SourceDescriptor::Tiles(tiles) => {
                assert_eq!(tiles.kind, TileKind::Vector);
                assert_eq!(tiles.maxzoom, Some(14));
                assert!(tiles.tiles.is_none());
            }
            other => panic!("expected tiles, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::GeoPoints.to_string(), "geo-points");
        assert_eq!(SourceKind::Tiles.to_string(), "tiles");
    }
}
