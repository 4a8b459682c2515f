//! Pointer-driven canvas gestures.
//!
//! [`CanvasInteraction`] turns pointer events into at most one document
//! change per gesture. It never mutates the document itself: a finished
//! stroke or a pending bucket fill is handed back as an
//! [`InteractionOutcome`] for the caller to apply and checkpoint. The
//! in-progress stroke is render-only state and never reaches history.

mod capture;
mod fill;
mod state;

pub use capture::{NoPointerSource, PointerCapture, PointerSource};
pub use fill::{FillError, FillJob, FillOutcome};
pub use state::InteractionState;

use crate::color::Rgba;
use crate::document::Document;
use crate::event::Notice;
use crate::input::PointerEvent;
use crate::layer::LayerId;
use crate::renderer::Renderer;
use crate::stroke::{PixelGrid, Stroke, StrokeBuilder, StrokeTool};
use egui::{PointerButton, Pos2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Bucket,
}

impl Tool {
    pub fn stroke_tool(self) -> Option<StrokeTool> {
        match self {
            Tool::Pen => Some(StrokeTool::Pen),
            Tool::Eraser => Some(StrokeTool::Eraser),
            Tool::Bucket => None,
        }
    }
}

/// Current tool selection and its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    pub tool: Tool,
    pub stroke_color: Rgba,
    pub stroke_width: f32,
    pub fill_color: Rgba,
    /// Flood fill tolerance, 0 to 255
    pub tolerance: u8,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            stroke_color: Rgba::BLACK,
            stroke_width: 5.0,
            fill_color: Rgba::BLACK,
            tolerance: 20,
        }
    }
}

/// What the caller must do after an input event.
#[derive(Debug)]
pub enum InteractionOutcome {
    /// Append the stroke to the layer and record one history entry
    StrokeCommitted { layer_id: LayerId, stroke: Stroke },
    /// Run the job, then pass its result to the editor
    FillRequested(FillJob),
    /// Show a transient message; nothing changed
    Notice(Notice),
}

pub struct CanvasInteraction {
    state: InteractionState,
    settings: ToolSettings,
    grid: Option<PixelGrid>,
    pointer_source: Arc<dyn PointerSource>,
}

impl CanvasInteraction {
    /// `grid` is set for pixel canvases, where strokes snap to cells.
    pub fn new(settings: ToolSettings, grid: Option<PixelGrid>, pointer_source: Arc<dyn PointerSource>) -> Self {
        Self {
            state: InteractionState::Idle,
            settings,
            grid,
            pointer_source,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ToolSettings {
        &mut self.settings
    }

    pub fn grid(&self) -> Option<PixelGrid> {
        self.grid
    }

    /// The uncommitted stroke and its layer, for live display.
    pub fn preview(&self) -> Option<(LayerId, Stroke)> {
        match &self.state {
            InteractionState::Drawing { layer_id, stroke, .. } => Some((*layer_id, stroke.preview())),
            _ => None,
        }
    }

    pub fn handle_pointer(&mut self, doc: &Document, event: PointerEvent) -> Option<InteractionOutcome> {
        match event {
            PointerEvent::Down { pos, button } => self.pointer_down(doc, pos, button),
            PointerEvent::Move { pos } => {
                self.pointer_move(pos);
                None
            }
            PointerEvent::Up { pos, button } => self.pointer_up(pos, button),
            PointerEvent::Leave { last_known } => self.pointer_leave(last_known),
            PointerEvent::Cancel => {
                self.cancel();
                None
            }
        }
    }

    pub fn pointer_down(&mut self, doc: &Document, pos: Pos2, button: PointerButton) -> Option<InteractionOutcome> {
        if button != PointerButton::Primary {
            return None;
        }
        self.release_abandoned_fill();
        match self.state {
            InteractionState::Idle => {}
            InteractionState::Filling { .. } => return Some(InteractionOutcome::Notice(Notice::FillPending)),
            InteractionState::Drawing { .. } => return None,
        }

        let Some(layer) = doc.active_layer().filter(|layer| layer.is_visible) else {
            log::warn!("Cannot paint: active layer is hidden or missing");
            return Some(InteractionOutcome::Notice(Notice::LayerHidden));
        };
        let layer_id = layer.id;

        match self.settings.tool.stroke_tool() {
            Some(tool) => {
                let stroke = match self.grid {
                    Some(grid) => StrokeBuilder::pixel_cells(tool, self.settings.stroke_color, grid, pos),
                    None => StrokeBuilder::polyline(
                        tool,
                        self.settings.stroke_color,
                        self.settings.stroke_width,
                        pos,
                    ),
                };
                let capture = PointerCapture::acquire(Arc::clone(&self.pointer_source));
                self.enter(InteractionState::Drawing {
                    layer_id,
                    stroke,
                    capture,
                });
                None
            }
            None => {
                let size = doc.size();
                if pos.x < 0.0 || pos.y < 0.0 || pos.x >= size.width as f32 || pos.y >= size.height as f32 {
                    return None;
                }
                let start = (pos.x.floor() as u32, pos.y.floor() as u32);
                let job = FillJob::new(
                    Arc::clone(layer),
                    Renderer::new(size),
                    start,
                    self.settings.fill_color,
                    self.settings.tolerance,
                );
                self.enter(InteractionState::Filling {
                    layer_id,
                    job: job.liveness(),
                });
                Some(InteractionOutcome::FillRequested(job))
            }
        }
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        if let InteractionState::Drawing { stroke, .. } = &mut self.state {
            stroke.add_point(pos);
        }
    }

    pub fn pointer_up(&mut self, pos: Pos2, button: PointerButton) -> Option<InteractionOutcome> {
        if button != PointerButton::Primary {
            return None;
        }
        self.pointer_move(pos);
        self.finish_stroke()
    }

    /// Tracking was lost; the stroke ends where it was last seen.
    pub fn pointer_leave(&mut self, last_known: Pos2) -> Option<InteractionOutcome> {
        self.pointer_move(last_known);
        self.finish_stroke()
    }

    /// Drops an in-progress stroke without committing it.
    pub fn cancel(&mut self) {
        self.release_abandoned_fill();
        if self.state.is_drawing() {
            self.leave_to_idle();
            log::debug!("Stroke cancelled");
        }
    }

    /// Switches tools. A stroke in progress is committed first.
    pub fn set_tool(&mut self, tool: Tool) -> Option<InteractionOutcome> {
        let outcome = self.finish_stroke();
        self.release_abandoned_fill();
        self.settings.tool = tool;
        outcome
    }

    /// Stops waiting for a pending fill. Its result, if it still arrives,
    /// is applied without blocking new gestures.
    pub fn abort_fill(&mut self) -> bool {
        if !self.state.is_filling() {
            return false;
        }
        if let Some(layer_id) = self.state.layer_id() {
            log::warn!("Aborting pending fill on {layer_id}");
        }
        self.leave_to_idle();
        true
    }

    /// Ends the `Filling` state for `layer_id`. Returns `false` if no such
    /// fill was pending.
    pub fn finish_fill(&mut self, layer_id: LayerId) -> bool {
        match self.state {
            InteractionState::Filling { layer_id: pending, .. } if pending == layer_id => {
                self.leave_to_idle();
                true
            }
            _ => false,
        }
    }

    fn finish_stroke(&mut self) -> Option<InteractionOutcome> {
        if !self.state.is_drawing() {
            return None;
        }
        match self.leave_to_idle() {
            InteractionState::Drawing { layer_id, stroke, capture } => {
                drop(capture);
                if stroke.is_empty() {
                    return None;
                }
                Some(InteractionOutcome::StrokeCommitted {
                    layer_id,
                    stroke: stroke.finish(),
                })
            }
            _ => None,
        }
    }

    /// Leaves `Filling` whose job was dropped before it could complete.
    fn release_abandoned_fill(&mut self) {
        if self.state.is_abandoned_fill() {
            log::warn!("Fill job was dropped without completing, unblocking the canvas");
            self.leave_to_idle();
        }
    }

    fn enter(&mut self, next: InteractionState) {
        if let Err(err) = self.state.transition(next) {
            log::error!("{err}");
        }
    }

    fn leave_to_idle(&mut self) -> InteractionState {
        match self.state.transition(InteractionState::Idle) {
            Ok(previous) => previous,
            Err(err) => {
                log::error!("{err}");
                InteractionState::Idle
            }
        }
    }
}

impl std::fmt::Debug for CanvasInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasInteraction")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("grid", &self.grid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CanvasSize, DrawingMetadata};
    use egui::pos2;

    fn setup() -> (Document, CanvasInteraction) {
        let doc = Document::new("t", CanvasSize::new(20, 20), DrawingMetadata::regular());
        let interaction = CanvasInteraction::new(ToolSettings::default(), None, Arc::new(NoPointerSource));
        (doc, interaction)
    }

    #[test]
    fn test_moves_accumulate_into_one_stroke() {
        let (doc, mut interaction) = setup();
        assert!(interaction.pointer_down(&doc, pos2(1.0, 1.0), PointerButton::Primary).is_none());
        for i in 0..5 {
            interaction.pointer_move(pos2(2.0 + i as f32, 1.0));
        }
        let Some(InteractionOutcome::StrokeCommitted { layer_id, stroke }) =
            interaction.pointer_up(pos2(9.0, 1.0), PointerButton::Primary)
        else {
            panic!("expected a committed stroke");
        };
        assert_eq!(Some(layer_id), doc.active_layer_id());
        // Seed pair, five moves, the release point.
        assert_eq!(stroke.points().len(), 8);
        assert!(interaction.state().is_idle());
    }

    #[test]
    fn test_secondary_button_is_ignored() {
        let (doc, mut interaction) = setup();
        assert!(interaction.pointer_down(&doc, pos2(1.0, 1.0), PointerButton::Secondary).is_none());
        assert!(interaction.state().is_idle());
    }

    #[test]
    fn test_cancel_discards_stroke() {
        let (doc, mut interaction) = setup();
        interaction.pointer_down(&doc, pos2(1.0, 1.0), PointerButton::Primary);
        assert!(interaction.preview().is_some());
        interaction.cancel();
        assert!(interaction.preview().is_none());
        assert!(interaction.pointer_up(pos2(1.0, 1.0), PointerButton::Primary).is_none());
    }

    #[test]
    fn test_tool_switch_commits_stroke() {
        let (doc, mut interaction) = setup();
        interaction.pointer_down(&doc, pos2(1.0, 1.0), PointerButton::Primary);
        let outcome = interaction.set_tool(Tool::Eraser);
        assert!(matches!(outcome, Some(InteractionOutcome::StrokeCommitted { .. })));
        assert_eq!(interaction.settings().tool, Tool::Eraser);
    }

    #[test]
    fn test_bucket_blocks_until_fill_finishes() {
        let (doc, mut interaction) = setup();
        interaction.set_tool(Tool::Bucket);
        let Some(InteractionOutcome::FillRequested(job)) =
            interaction.pointer_down(&doc, pos2(3.0, 3.0), PointerButton::Primary)
        else {
            panic!("expected a fill job");
        };
        assert_eq!(job.start(), (3, 3));
        assert!(matches!(
            interaction.pointer_down(&doc, pos2(4.0, 4.0), PointerButton::Primary),
            Some(InteractionOutcome::Notice(Notice::FillPending))
        ));
        assert!(!interaction.finish_fill(LayerId::new()));
        assert!(interaction.finish_fill(job.layer_id()));
        assert!(interaction.state().is_idle());
    }

    #[test]
    fn test_dropped_fill_job_unblocks_canvas() {
        let (doc, mut interaction) = setup();
        interaction.set_tool(Tool::Bucket);
        let job = interaction.pointer_down(&doc, pos2(3.0, 3.0), PointerButton::Primary);
        assert!(interaction.state().is_filling());
        drop(job);

        interaction.set_tool(Tool::Pen);
        assert!(interaction.state().is_idle());
        interaction.pointer_down(&doc, pos2(1.0, 1.0), PointerButton::Primary);
        assert!(matches!(
            interaction.pointer_up(pos2(5.0, 1.0), PointerButton::Primary),
            Some(InteractionOutcome::StrokeCommitted { .. })
        ));
    }

    #[test]
    fn test_clone_of_fill_job_keeps_canvas_blocked() {
        let (doc, mut interaction) = setup();
        interaction.set_tool(Tool::Bucket);
        let Some(InteractionOutcome::FillRequested(job)) =
            interaction.pointer_down(&doc, pos2(3.0, 3.0), PointerButton::Primary)
        else {
            panic!("expected a fill job");
        };
        let copy = job.clone();
        drop(job);
        assert!(matches!(
            interaction.pointer_down(&doc, pos2(3.0, 3.0), PointerButton::Primary),
            Some(InteractionOutcome::Notice(Notice::FillPending))
        ));
        drop(copy);
        assert!(matches!(
            interaction.pointer_down(&doc, pos2(3.0, 3.0), PointerButton::Primary),
            Some(InteractionOutcome::FillRequested(_))
        ));
    }

    #[test]
    fn test_abort_fill_returns_to_idle() {
        let (doc, mut interaction) = setup();
        interaction.set_tool(Tool::Bucket);
        let _job = interaction.pointer_down(&doc, pos2(3.0, 3.0), PointerButton::Primary);
        assert!(interaction.abort_fill());
        assert!(interaction.state().is_idle());
        assert!(!interaction.abort_fill());
    }

    #[test]
    fn test_bucket_outside_canvas_does_nothing() {
        let (doc, mut interaction) = setup();
        interaction.set_tool(Tool::Bucket);
        assert!(interaction.pointer_down(&doc, pos2(20.0, 3.0), PointerButton::Primary).is_none());
        assert!(interaction.state().is_idle());
    }

    #[test]
    fn test_pixel_grid_strokes_snap_to_cells() {
        let doc = Document::new("t", CanvasSize::new(100, 100), DrawingMetadata::pixel(10));
        let grid = doc.metadata().pixel_grid(doc.size(), 25);
        let mut interaction = CanvasInteraction::new(ToolSettings::default(), grid, Arc::new(NoPointerSource));

        interaction.pointer_down(&doc, pos2(5.0, 5.0), PointerButton::Primary);
        interaction.pointer_move(pos2(7.0, 5.0));
        interaction.pointer_move(pos2(15.0, 5.0));
        let Some(InteractionOutcome::StrokeCommitted { stroke, .. }) =
            interaction.pointer_up(pos2(15.0, 5.0), PointerButton::Primary)
        else {
            panic!("expected a committed stroke");
        };
        assert_eq!(stroke.cells().len(), 2);
        assert_eq!(stroke.width, 10.0);
    }
}
