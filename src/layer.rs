use crate::raster::RasterSnapshot;
use crate::stroke::Stroke;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a layer, stable for the layer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

fn default_opacity() -> f32 {
    1.0
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique identifier for the layer
    pub id: LayerId,
    /// Display name of the layer, not necessarily unique
    pub name: String,
    /// Hidden layers are skipped by rendering and cannot be painted on
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    /// Applied once to the layer's composited output, in `[0, 1]`
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Committed pixel content (bucket fills); `None` is fully transparent
    #[serde(default)]
    pub raster: Option<RasterSnapshot>,
    /// Painted on top of `raster`, in order
    #[serde(default)]
    pub strokes: Vec<Stroke>,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_string(),
            is_visible: true,
            opacity: 1.0,
            raster: None,
            strokes: Vec::new(),
        }
    }

    pub fn with_raster(mut self, raster: Option<RasterSnapshot>) -> Self {
        self.raster = raster;
        self
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Adds a stroke to the layer
    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }
}
