use crate::color::{Rgba, colors_match};
use crate::flood_fill::{flood_fill_in_place, sample};
use crate::layer::{Layer, LayerId};
use crate::raster::RasterSnapshot;
use crate::renderer::{RenderError, Renderer};
use std::sync::{Arc, Weak};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("bucket fill on {layer_id} failed: {source}")]
pub struct FillError {
    pub layer_id: LayerId,
    #[source]
    pub source: RenderError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    /// New raster for the layer, composite plus the filled region
    Filled {
        layer_id: LayerId,
        raster: RasterSnapshot,
        painted: usize,
    },
    /// The clicked pixel already matches the fill color
    AlreadyFilled { layer_id: LayerId },
    /// Nothing to fill at the start pixel
    Unchanged { layer_id: LayerId },
}

impl FillOutcome {
    pub fn layer_id(&self) -> LayerId {
        match self {
            FillOutcome::Filled { layer_id, .. }
            | FillOutcome::AlreadyFilled { layer_id }
            | FillOutcome::Unchanged { layer_id } => *layer_id,
        }
    }
}

/// A bucket fill captured at pointer-down.
///
/// Holds its own copy of the layer, so later edits to the document cannot
/// produce a partial composite. The result is applied with
/// [`crate::editor::Editor::complete_fill`]. Dropping every copy of the job
/// without running it releases the canvas from its pending fill.
#[derive(Debug, Clone)]
pub struct FillJob {
    alive: Arc<()>,
    layer: Arc<Layer>,
    renderer: Renderer,
    start: (u32, u32),
    fill: Rgba,
    tolerance: u8,
}

impl FillJob {
    pub(crate) fn new(layer: Arc<Layer>, renderer: Renderer, start: (u32, u32), fill: Rgba, tolerance: u8) -> Self {
        Self {
            alive: Arc::new(()),
            layer,
            renderer,
            start,
            fill,
            tolerance,
        }
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer.id
    }

    /// Goes dead when the last copy of this job is dropped.
    pub(crate) fn liveness(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }

    pub fn start(&self) -> (u32, u32) {
        self.start
    }

    /// Composites the layer (raster, then every stroke in order) and flood
    /// fills the composite from the start pixel.
    pub async fn run(self) -> Result<FillOutcome, FillError> {
        let layer_id = self.layer.id;
        let fail = |source| FillError { layer_id, source };

        let mut composite = self.renderer.composite_layer_buffer(&self.layer).map_err(fail)?;
        let (x, y) = self.start;
        let Some(target) = sample(&composite, x, y) else {
            return Ok(FillOutcome::Unchanged { layer_id });
        };

        if colors_match(target, self.fill, self.tolerance) {
            log::debug!("Skipping fill on {layer_id}: {target} already matches {}", self.fill);
            return Ok(FillOutcome::AlreadyFilled { layer_id });
        }

        let Some(painted) = flood_fill_in_place(&mut composite, self.start, target, self.fill, self.tolerance) else {
            return Ok(FillOutcome::Unchanged { layer_id });
        };

        let raster = RasterSnapshot::encode(&composite).map_err(|err| fail(err.into()))?;
        Ok(FillOutcome::Filled {
            layer_id,
            raster,
            painted,
        })
    }
}
