//! Descriptor payload types for the three source variants.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Feature data for a geo-points source: either a URL the engine fetches or an
/// inline GeoJSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoPointsData {
    Url(String),
    Inline(Value),
}

impl GeoPointsData {
    /// Whether this payload carries anything worth pushing into the engine.
    ///
    /// An empty URL and a JSON `null` count as "not defined".
    pub fn is_defined(&self) -> bool {
        match self {
            GeoPointsData::Url(url) => !url.is_empty(),
            GeoPointsData::Inline(value) => !value.is_null(),
        }
    }
}

/// Geo-points source descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoPointsDescriptor {
    /// Feature payload, compared by `Arc` identity on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Arc<GeoPointsData>>,

    /// Engine-specific options (clustering, buffer, tolerance, ...), passed
    /// through opaquely.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl GeoPointsDescriptor {
    /// Descriptor holding the given data payload and no options.
    pub fn with_data(data: GeoPointsData) -> Self {
        Self {
            data: Some(Arc::new(data)),
            options: Map::new(),
        }
    }

    /// Descriptor holding an inline GeoJSON document.
    pub fn inline(document: Value) -> Self {
        Self::with_data(GeoPointsData::Inline(document))
    }

    /// Set an engine option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// The four geographic corners of an image source, each `[longitude, latitude]`,
/// ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageCoordinates(pub [[f64; 2]; 4]);

impl ImageCoordinates {
    /// Axis-aligned corners from a west/south/east/north bounding box.
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self([[west, north], [east, north], [east, south], [west, south]])
    }

    pub fn corners(&self) -> &[[f64; 2]; 4] {
        &self.0
    }
}

/// Image source descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Image URL.
    pub url: String,

    /// Corner coordinates, compared by `Arc` identity on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Arc<ImageCoordinates>>,
}

impl ImageDescriptor {
    pub fn new(url: impl Into<String>, coordinates: ImageCoordinates) -> Self {
        Self {
            url: url.into(),
            coordinates: Some(Arc::new(coordinates)),
        }
    }
}

/// Tile flavor of a tile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    #[default]
    Raster,
    Vector,
}

/// Tile source descriptor.
///
/// Every field that [`TileDescriptor::needs_replace`] inspects is fixed at
/// construction time in the engine; changing one requires destroying and
/// recreating the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileDescriptor {
    #[serde(default)]
    pub kind: TileKind,

    /// TileJSON URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Literal tile URL templates, compared by `Arc` identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Arc<[String]>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,

    /// Tile edge length in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
}

impl TileDescriptor {
    /// Raster tiles described by a TileJSON URL.
    pub fn raster_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Raster tiles described by literal URL templates.
    pub fn raster_tiles<I, S>(tiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tiles: Some(tiles.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: TileKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_zoom_range(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.minzoom = Some(minzoom);
        self.maxzoom = Some(maxzoom);
        self
    }

    /// Whether moving from `self` to `next` requires recreating the source.
    ///
    /// Compares url, minzoom, maxzoom by value and the tile list by identity.
    pub fn needs_replace(&self, next: &TileDescriptor) -> bool {
        let tiles_changed = match (&self.tiles, &next.tiles) {
            (None, None) => false,
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            _ => true,
        };

        tiles_changed
            || self.url != next.url
            || self.minzoom != next.minzoom
            || self.maxzoom != next.maxzoom
    }
}
