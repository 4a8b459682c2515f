//! An editing session over one drawing.
//!
//! The [`Editor`] is the only place the live document is mutated. Every
//! change goes through [`Editor::update_layers`]: the document operation
//! runs, history is checkpointed unless the change is marked
//! [`HistoryMode::Skip`], and the drawing is autosaved.

use crate::config::EditorConfig;
use crate::document::{Document, DrawingMetadata};
use crate::event::{DocumentEvent, EditorEvent, EventBus, LayerEvent, Notice};
use crate::flood_fill::PixelBuffer;
use crate::history::History;
use crate::id_generator::generate_drawing_id;
use crate::input::{HistoryAction, PointerEvent, history_action};
use crate::interaction::{
    CanvasInteraction, FillError, FillJob, FillOutcome, InteractionOutcome, PointerSource, Tool,
    ToolSettings,
};
use crate::layer::LayerId;
use crate::persistence::{DrawingData, DrawingStore, PersistenceResult};
use crate::renderer::{RenderError, Renderer};
use egui::{Key, Modifiers};
use std::sync::Arc;

/// Whether a layer change gets its own undo step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Record,
    /// Intermediate states, such as an opacity slider mid-drag
    Skip,
}

pub struct Editor {
    document: Document,
    history: History,
    interaction: CanvasInteraction,
    renderer: Renderer,
    config: EditorConfig,
    store: Arc<dyn DrawingStore>,
    events: EventBus,
    derived_from_post_id: Option<String>,
}

impl Editor {
    /// Opens drawing `id` from `store`, or starts a fresh one under that id
    /// if nothing is stored. Opening never writes to the store.
    pub fn open(
        id: &str,
        config: EditorConfig,
        store: Arc<dyn DrawingStore>,
        pointer_source: Arc<dyn PointerSource>,
        events: EventBus,
    ) -> PersistenceResult<Self> {
        let (document, derived_from_post_id, event) = match store.load(id)? {
            Some(data) => {
                log::info!("Loaded drawing {id} with {} layers", data.layers.len());
                let derived = data.derived_from_post_id.clone();
                (data.into_document(id), derived, DocumentEvent::Loaded { id: id.to_string() })
            }
            None => {
                log::info!("No stored drawing {id}, starting a blank one");
                let doc = Document::new(id, config.canvas_size(), DrawingMetadata::regular());
                (doc, None, DocumentEvent::Created { id: id.to_string() })
            }
        };

        let mut editor = Self::with_document(document, config, store, pointer_source, events);
        editor.derived_from_post_id = derived_from_post_id;
        editor.emit(EditorEvent::DocumentChanged(event));
        Ok(editor)
    }

    /// Starts a new drawing under a generated id and saves it as a draft.
    pub fn create(
        metadata: DrawingMetadata,
        config: EditorConfig,
        store: Arc<dyn DrawingStore>,
        pointer_source: Arc<dyn PointerSource>,
        events: EventBus,
    ) -> PersistenceResult<Self> {
        let id = generate_drawing_id();
        let document = Document::new(&id, config.canvas_size(), metadata);
        store.save(&id, &DrawingData::from_document(&document))?;
        log::info!("Created drawing {id}");

        let editor = Self::with_document(document, config, store, pointer_source, events);
        editor.emit(EditorEvent::DocumentChanged(DocumentEvent::Created { id }));
        Ok(editor)
    }

    fn with_document(
        document: Document,
        config: EditorConfig,
        store: Arc<dyn DrawingStore>,
        pointer_source: Arc<dyn PointerSource>,
        events: EventBus,
    ) -> Self {
        let grid = document
            .metadata()
            .pixel_grid(document.size(), config.default_grid_size);
        Self {
            history: History::with_max_len(document.snapshot(), config.history_len()),
            interaction: CanvasInteraction::new(config.tool_settings(), grid, pointer_source),
            renderer: Renderer::new(document.size()),
            document,
            config,
            store,
            events,
            derived_from_post_id: None,
        }
    }

    pub fn id(&self) -> &str {
        self.document.id()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn interaction(&self) -> &CanvasInteraction {
        &self.interaction
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn tool_settings(&self) -> &ToolSettings {
        self.interaction.settings()
    }

    /// Colors, width and tolerance. Use [`Editor::set_tool`] to change tools.
    pub fn tool_settings_mut(&mut self) -> &mut ToolSettings {
        self.interaction.settings_mut()
    }

    pub fn derived_from_post_id(&self) -> Option<&str> {
        self.derived_from_post_id.as_deref()
    }

    pub fn set_derived_from_post_id(&mut self, post_id: Option<String>) {
        self.derived_from_post_id = post_id;
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- layer operations ---

    /// Runs `f` against the document. If it reports a change, the change is
    /// checkpointed (unless `mode` is `Skip`) and saved.
    pub fn update_layers(&mut self, mode: HistoryMode, f: impl FnOnce(&mut Document) -> bool) -> bool {
        if !f(&mut self.document) {
            return false;
        }
        if mode == HistoryMode::Record {
            self.history.commit(self.document.snapshot());
            self.emit_history();
        }
        self.autosave();
        true
    }

    pub fn add_layer(&mut self) -> LayerId {
        let mut added = None;
        self.update_layers(HistoryMode::Record, |doc| {
            added = Some(doc.add_layer());
            true
        });
        let layer_id = added.unwrap_or_default();
        self.emit(EditorEvent::LayerChanged(LayerEvent::Added { layer_id }));
        self.emit(EditorEvent::ActiveLayerChanged { layer_id });
        layer_id
    }

    pub fn delete_layer(&mut self, layer_id: LayerId) -> bool {
        let was_active = self.document.active_layer_id() == Some(layer_id);
        let deleted = self.update_layers(HistoryMode::Record, |doc| doc.delete_layer(layer_id));
        if deleted {
            self.emit(EditorEvent::LayerChanged(LayerEvent::Removed { layer_id }));
            if was_active {
                self.emit_active_layer();
            }
        }
        deleted
    }

    pub fn toggle_visibility(&mut self, layer_id: LayerId) -> bool {
        let toggled = self.update_layers(HistoryMode::Record, |doc| doc.toggle_visibility(layer_id));
        if let Some(layer) = self.document.layer(layer_id).filter(|_| toggled) {
            let visible = layer.is_visible;
            self.emit(EditorEvent::LayerChanged(LayerEvent::VisibilityChanged { layer_id, visible }));
        }
        toggled
    }

    pub fn set_layer_opacity(&mut self, layer_id: LayerId, opacity: f32, mode: HistoryMode) -> bool {
        let changed = self.update_layers(mode, |doc| doc.set_layer_opacity(layer_id, opacity));
        if let Some(layer) = self.document.layer(layer_id).filter(|_| changed) {
            let opacity = layer.opacity;
            self.emit(EditorEvent::LayerChanged(LayerEvent::OpacityChanged { layer_id, opacity }));
        }
        changed
    }

    pub fn rename_layer(&mut self, layer_id: LayerId, name: &str) -> bool {
        let renamed = self.update_layers(HistoryMode::Record, |doc| doc.rename_layer(layer_id, name));
        if renamed {
            let name = name.to_string();
            self.emit(EditorEvent::LayerChanged(LayerEvent::Renamed { layer_id, name }));
        }
        renamed
    }

    pub fn reorder_layer(&mut self, moved: LayerId, target: LayerId) -> bool {
        let reordered = self.update_layers(HistoryMode::Record, |doc| doc.reorder_layer(moved, target));
        if reordered {
            self.emit(EditorEvent::LayerChanged(LayerEvent::Reordered { moved, target }));
        }
        reordered
    }

    /// Selection only; not an undo step and not saved.
    pub fn set_active_layer(&mut self, layer_id: LayerId) -> bool {
        let changed = self.document.set_active_layer(layer_id);
        if changed {
            self.emit(EditorEvent::ActiveLayerChanged { layer_id });
        }
        changed
    }

    // --- history ---

    pub fn undo(&mut self) -> bool {
        let Some(layers) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(layers);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(layers) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(layers);
        true
    }

    fn restore(&mut self, layers: crate::document::LayerList) {
        let active = self.document.active_layer_id();
        self.document.restore_layers(layers);
        self.emit(EditorEvent::LayerChanged(LayerEvent::Restored));
        self.emit_history();
        if self.document.active_layer_id() != active {
            self.emit_active_layer();
        }
        self.autosave();
    }

    /// Keyboard undo/redo. Returns `true` if the key combination was one of them.
    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> bool {
        match history_action(key, modifiers) {
            Some(HistoryAction::Undo) => {
                self.undo();
                true
            }
            Some(HistoryAction::Redo) => {
                self.redo();
                true
            }
            None => false,
        }
    }

    // --- canvas input ---

    /// Feeds one pointer event to the canvas. A bucket click returns the
    /// fill to run; hand its result to [`Editor::complete_fill`].
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<FillJob> {
        let outcome = self.interaction.handle_pointer(&self.document, event)?;
        self.apply_outcome(outcome)
    }

    /// Changes tool, committing any stroke in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        let old = self.interaction.settings().tool;
        if let Some(outcome) = self.interaction.set_tool(tool) {
            self.apply_outcome(outcome);
        }
        if old != tool {
            self.emit(EditorEvent::ToolChanged { old, new: tool });
        }
    }

    /// Applies a finished bucket fill and unblocks the canvas. Returns
    /// `true` if the layer's raster was replaced.
    pub fn complete_fill(&mut self, result: Result<FillOutcome, FillError>) -> bool {
        let layer_id = match &result {
            Ok(outcome) => outcome.layer_id(),
            Err(err) => err.layer_id,
        };
        self.interaction.finish_fill(layer_id);

        match result {
            Ok(FillOutcome::Filled { layer_id, raster, painted }) => {
                let replaced = self.update_layers(HistoryMode::Record, |doc| doc.replace_raster(layer_id, raster));
                if replaced {
                    log::debug!("Filled {painted} pixels on {layer_id}");
                    self.emit(EditorEvent::LayerChanged(LayerEvent::ContentChanged { layer_id }));
                    self.emit(EditorEvent::FillCompleted { layer_id });
                }
                replaced
            }
            Ok(outcome) => {
                log::debug!("Fill left {layer_id} unchanged: {outcome:?}");
                false
            }
            Err(err) => {
                log::error!("{err}");
                false
            }
        }
    }

    /// Stops waiting for a pending bucket fill so the canvas accepts input
    /// again. Dropping the fill job has the same effect.
    pub fn abort_fill(&mut self) -> bool {
        self.interaction.abort_fill()
    }

    /// Runs `job` and applies its result.
    pub async fn run_fill(&mut self, job: FillJob) -> bool {
        let result = job.run().await;
        self.complete_fill(result)
    }

    fn apply_outcome(&mut self, outcome: InteractionOutcome) -> Option<FillJob> {
        match outcome {
            InteractionOutcome::StrokeCommitted { layer_id, stroke } => {
                if self.update_layers(HistoryMode::Record, |doc| doc.append_stroke(layer_id, stroke)) {
                    self.emit(EditorEvent::LayerChanged(LayerEvent::ContentChanged { layer_id }));
                    self.emit(EditorEvent::StrokeCommitted { layer_id });
                }
                None
            }
            InteractionOutcome::FillRequested(job) => Some(job),
            InteractionOutcome::Notice(notice) => {
                self.notify(notice);
                None
            }
        }
    }

    // --- rendering ---

    /// The canvas as displayed, including any stroke in progress.
    pub fn render(&self) -> Result<PixelBuffer, RenderError> {
        let preview = self.interaction.preview();
        let preview = preview.as_ref().map(|(layer_id, stroke)| (*layer_id, stroke));
        self.renderer.render_layers(self.document.layers(), preview)
    }

    /// Committed visible layers only.
    pub fn flatten(&self) -> Result<PixelBuffer, RenderError> {
        self.renderer.flatten(self.document.layers())
    }

    pub fn flatten_png(&self) -> Result<Vec<u8>, RenderError> {
        self.renderer.flatten_png(&self.document.snapshot())
    }

    /// `None` for an unknown layer.
    pub fn thumbnail(&self, layer_id: LayerId, width: u32, height: u32) -> Result<Option<PixelBuffer>, RenderError> {
        self.document
            .layer(layer_id)
            .map(|layer| self.renderer.thumbnail(layer, width, height))
            .transpose()
    }

    // --- plumbing ---

    fn autosave(&self) {
        let id = self.document.id().to_string();
        let data = DrawingData {
            derived_from_post_id: self.derived_from_post_id.clone(),
            ..DrawingData::from_document(&self.document)
        };
        match self.store.save(&id, &data) {
            Ok(()) => {
                log::debug!("Saved drawing {id}");
                self.emit(EditorEvent::DocumentChanged(DocumentEvent::Saved { id }));
            }
            Err(err) => {
                log::error!("Failed to save drawing {id}: {err}");
                let reason = err.to_string();
                self.emit(EditorEvent::DocumentChanged(DocumentEvent::SaveFailed { id, reason }));
            }
        }
    }

    fn notify(&self, notice: Notice) {
        log::info!("{}", notice.message());
        self.emit(EditorEvent::Notice(notice));
    }

    fn emit_history(&self) {
        self.emit(EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn emit_active_layer(&self) {
        if let Some(layer_id) = self.document.active_layer_id() {
            self.emit(EditorEvent::ActiveLayerChanged { layer_id });
        }
    }

    fn emit(&self, event: EditorEvent) {
        self.events.emit(event);
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.document.id())
            .field("layers", &self.document.layers().len())
            .field("history", &self.history.len())
            .field("interaction", &self.interaction)
            .finish_non_exhaustive()
    }
}
