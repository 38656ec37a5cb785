//! Template ingestion and the save payload.
//!
//! Templates are the JSON documents produced by the template gallery. Only
//! the canvas size and layers are interpreted; everything else is carried
//! through untouched and written back out by [`Template::to_json`].

use crate::composition::{Composition, Metadata};
use crate::layer::Layer;
use common::error::{StudioError, StudioResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CANVAS_WIDTH: u32 = 1280;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 720;

fn default_canvas_width() -> u32 {
    DEFAULT_CANVAS_WIDTH
}

fn default_canvas_height() -> u32 {
    DEFAULT_CANVAS_HEIGHT
}

/// A composition as exchanged with the outside world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(flatten)]
    pub metadata: Metadata,
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Template {
    /// Parse a single template object.
    pub fn from_json(json: &str) -> StudioResult<Template> {
        let template: Template = serde_json::from_str(json)
            .map_err(|e| StudioError::template(format!("invalid template: {}", e)))?;
        debug!(
            name = %template.metadata.name,
            layers = template.layers.len(),
            "template parsed"
        );
        Ok(template)
    }

    /// Parse either a single template or an array of templates.
    pub fn list_from_json(json: &str) -> StudioResult<Vec<Template>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let templates = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<Template>, _>>(),
            other => serde_json::from_value(other).map(|t| vec![t]),
        };
        templates.map_err(|e| StudioError::template(format!("invalid template: {}", e)))
    }

    /// Seed a composition. Layers are taken as-is, z-indices included.
    pub fn into_composition(self) -> Composition {
        Composition::new(self.canvas_width, self.canvas_height, self.layers)
            .with_metadata(self.metadata)
    }

    /// Snapshot of the current state of a composition.
    pub fn from_composition(composition: &Composition) -> Template {
        Template {
            metadata: composition.metadata.clone(),
            canvas_width: composition.canvas_width,
            canvas_height: composition.canvas_height,
            layers: composition.layers().to_vec(),
        }
    }

    pub fn to_json(&self) -> StudioResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<Template> for Composition {
    fn from(template: Template) -> Self {
        template.into_composition()
    }
}
