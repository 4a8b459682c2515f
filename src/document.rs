use crate::color::Rgba;
use crate::layer::{Layer, LayerId};
use crate::raster::RasterSnapshot;
use crate::stroke::{PixelGrid, Stroke};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Ordered layers, bottom first. Layers are shared and copied on write, so
/// untouched layers keep their identity across edits.
pub type LayerList = Vec<Arc<Layer>>;

/// Fixed pixel dimensions of a whole drawing. Both sides are at least 1,
/// also when read back from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCanvasSize")]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
#[error("canvas size {width}x{height} has an empty side")]
pub struct EmptyCanvasError {
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
struct StoredCanvasSize {
    width: u32,
    height: u32,
}

impl TryFrom<StoredCanvasSize> for CanvasSize {
    type Error = EmptyCanvasError;

    fn try_from(StoredCanvasSize { width, height }: StoredCanvasSize) -> Result<Self, Self::Error> {
        if width == 0 || height == 0 {
            return Err(EmptyCanvasError { width, height });
        }
        Ok(Self { width, height })
    }
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(500, 500)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasType {
    /// Free polylines.
    #[default]
    Regular,
    /// Grid-snapped cell strokes.
    Pixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingMetadata {
    pub canvas_type: CanvasType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u32>,
}

impl DrawingMetadata {
    pub fn regular() -> Self {
        Self::default()
    }

    pub fn pixel(grid_size: u32) -> Self {
        Self {
            canvas_type: CanvasType::Pixel,
            grid_size: Some(grid_size),
        }
    }

    /// Snapping grid for pixel canvases.
    pub fn pixel_grid(&self, size: CanvasSize, default_cells: u32) -> Option<PixelGrid> {
        match self.canvas_type {
            CanvasType::Regular => None,
            CanvasType::Pixel => Some(PixelGrid::new(
                size.width,
                self.grid_size.unwrap_or(default_cells),
            )),
        }
    }
}

/// A drawing: its layers, which one is active, and its fixed canvas size.
///
/// Every operation addressing a layer id that does not exist is a no-op
/// returning `false`; callers can hold stale ids safely.
#[derive(Debug, Clone)]
pub struct Document {
    id: String,
    layers: LayerList,
    active_layer_id: Option<LayerId>,
    size: CanvasSize,
    metadata: DrawingMetadata,
}

impl Document {
    /// A fresh drawing with one opaque white layer.
    pub fn new(id: &str, size: CanvasSize, metadata: DrawingMetadata) -> Self {
        let raster = match RasterSnapshot::solid(size.width, size.height, Rgba::WHITE) {
            Ok(raster) => Some(raster),
            Err(err) => {
                log::error!("Failed to create background for drawing {id}: {err}");
                None
            }
        };
        let layer = Layer::new("Layer 1").with_raster(raster);
        let active = layer.id;

        Self {
            id: id.to_string(),
            layers: vec![Arc::new(layer)],
            active_layer_id: Some(active),
            size,
            metadata,
        }
    }

    /// Rebuilds a drawing from stored layers; the top layer becomes active.
    pub fn from_parts(id: &str, layers: LayerList, size: CanvasSize, metadata: DrawingMetadata) -> Self {
        let active_layer_id = layers.last().map(|layer| layer.id);
        Self {
            id: id.to_string(),
            layers,
            active_layer_id,
            size,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn metadata(&self) -> DrawingMetadata {
        self.metadata
    }

    pub fn layers(&self) -> &[Arc<Layer>] {
        &self.layers
    }

    /// A value copy of the layer list, sharing unchanged layers.
    pub fn snapshot(&self) -> LayerList {
        self.layers.clone()
    }

    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.active_layer_id
    }

    pub fn active_layer(&self) -> Option<&Arc<Layer>> {
        self.active_layer_id.and_then(|id| self.layer(id))
    }

    pub fn layer(&self, id: LayerId) -> Option<&Arc<Layer>> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.layer_index(id).is_none() {
            return false;
        }
        self.active_layer_id = Some(id);
        true
    }

    /// Replaces the whole layer list (history navigation). Keeps the active
    /// layer when it still exists, otherwise activates the top layer.
    pub fn restore_layers(&mut self, layers: LayerList) {
        self.layers = layers;
        let still_present = self
            .active_layer_id
            .is_some_and(|id| self.layer_index(id).is_some());
        if !still_present {
            self.active_layer_id = self.layers.last().map(|layer| layer.id);
        }
    }

    /// Appends a transparent layer named after the current count and makes it active.
    pub fn add_layer(&mut self) -> LayerId {
        let layer = Layer::new(&format!("Layer {}", self.layers.len() + 1));
        let id = layer.id;
        self.layers.push(Arc::new(layer));
        self.active_layer_id = Some(id);
        log::info!("Added {id} to drawing {}", self.id);
        id
    }

    /// Removes a layer. The sole remaining layer cannot be deleted.
    ///
    /// If the removed layer was active, the layer now at its index becomes
    /// active, or the new top layer when it was the top.
    pub fn delete_layer(&mut self, id: LayerId) -> bool {
        let Some(index) = self.layer_index(id) else {
            return false;
        };
        if self.layers.len() == 1 {
            log::warn!("Refusing to delete the last layer of drawing {}", self.id);
            return false;
        }

        self.layers.remove(index);
        if self.active_layer_id == Some(id) {
            let next = index.min(self.layers.len() - 1);
            self.active_layer_id = Some(self.layers[next].id);
        }
        true
    }

    pub fn toggle_visibility(&mut self, id: LayerId) -> bool {
        self.modify_layer(id, |layer| layer.is_visible = !layer.is_visible)
    }

    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        self.modify_layer(id, |layer| layer.set_opacity(opacity))
    }

    pub fn rename_layer(&mut self, id: LayerId, name: &str) -> bool {
        self.modify_layer(id, |layer| layer.set_name(name.to_string()))
    }

    /// Moves `moved` to the position currently held by `target`, shifting
    /// the layers in between.
    pub fn reorder_layer(&mut self, moved: LayerId, target: LayerId) -> bool {
        let (Some(from), Some(to)) = (self.layer_index(moved), self.layer_index(target)) else {
            return false;
        };
        if from == to {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        true
    }

    pub fn append_stroke(&mut self, id: LayerId, stroke: Stroke) -> bool {
        self.modify_layer(id, |layer| layer.add_stroke(stroke))
    }

    /// Swaps in new committed pixels; strokes are left alone.
    pub fn replace_raster(&mut self, id: LayerId, raster: RasterSnapshot) -> bool {
        self.modify_layer(id, |layer| layer.raster = Some(raster))
    }

    fn modify_layer(&mut self, id: LayerId, f: impl FnOnce(&mut Layer)) -> bool {
        match self.layers.iter_mut().find(|layer| layer.id == id) {
            Some(layer) => {
                f(Arc::make_mut(layer));
                true
            }
            None => {
                log::debug!("Ignoring edit of missing {id}");
                false
            }
        }
    }
}
