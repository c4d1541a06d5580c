//! Scenario files for `mapsync replay`.
//!
//! A scenario is a JSON document with an ordered list of steps, each tagged by
//! `op`:
//!
//! ```json
//! {
//!   "steps": [
//!     {"op": "attach", "props": {"id": "satellite", "tiles": {"url": "mapbox://mapbox.satellite"}},
//!      "children": [{"id": "satellite-raster", "type": "raster", "source": "satellite"}]},
//!     {"op": "load"},
//!     {"op": "pump"},
//!     {"op": "reset_style"},
//!     {"op": "pump"},
//!     {"op": "detach", "id": "satellite"}
//!   ]
//! }
//! ```
//!
//! Props use the optional-slot form (`geo_points`, `tiles`, `image`) so that
//! the configured variant policy applies. Every step deserializes fresh
//! payloads, so an `update` always hands the component new allocations.

use std::fs;
use std::path::Path;

use mapsync::descriptor::{GeoPointsDescriptor, ImageDescriptor, TileDescriptor};
use mapsync::engine::LayerSpec;
use mapsync::{SourceProps, VariantPolicy};
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|source| CliError::ScenarioRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::ScenarioParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One host or engine action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Mount a component with its child layers.
    Attach {
        props: PropsSpec,
        #[serde(default)]
        children: Vec<LayerSpec>,
    },
    /// Deliver new props to a mounted component.
    Update { props: PropsSpec },
    /// Unmount a component.
    Detach { id: String },
    /// Add a layer directly to the engine, outside any component.
    AddLayer {
        layer: LayerSpec,
        #[serde(default)]
        before: Option<String>,
    },
    /// Wipe the engine registry as a style reload would.
    ResetStyle,
    /// Finish loading one source, or every source when `id` is omitted.
    Load {
        #[serde(default)]
        id: Option<String>,
    },
    /// Deliver queued engine events.
    Pump,
}

impl Step {
    /// Short label for the replay log.
    pub fn label(&self) -> String {
        match self {
            Step::Attach { props, .. } => format!("attach {}", props.id),
            Step::Update { props } => format!("update {}", props.id),
            Step::Detach { id } => format!("detach {}", id),
            Step::AddLayer { layer, .. } => format!("add_layer {}", layer.id),
            Step::ResetStyle => "reset_style".to_string(),
            Step::Load { id: Some(id) } => format!("load {}", id),
            Step::Load { id: None } => "load *".to_string(),
            Step::Pump => "pump".to_string(),
        }
    }
}

/// Source props with one optional slot per variant.
#[derive(Debug, Clone, Deserialize)]
pub struct PropsSpec {
    pub id: String,
    #[serde(default)]
    pub geo_points: Option<GeoPointsDescriptor>,
    #[serde(default)]
    pub tiles: Option<TileDescriptor>,
    #[serde(default)]
    pub image: Option<ImageDescriptor>,
}

impl PropsSpec {
    pub fn resolve(self, policy: VariantPolicy) -> mapsync::Result<SourceProps> {
        SourceProps::from_variants(self.id, self.geo_points, self.tiles, self.image, policy)
    }
}
