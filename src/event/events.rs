use crate::interaction::Tool;
use crate::layer::LayerId;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ToolChanged {
        old: Tool,
        new: Tool,
    },
    ActiveLayerChanged {
        layer_id: LayerId,
    },
    LayerChanged(LayerEvent),
    StrokeCommitted {
        layer_id: LayerId,
    },
    FillCompleted {
        layer_id: LayerId,
    },
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    Notice(Notice),
    DocumentChanged(DocumentEvent),
}

/// Coarse event categories for [`crate::event::EventBus::subscribe_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Tool,
    ActiveLayer,
    Layer,
    Stroke,
    Fill,
    History,
    Notice,
    Document,
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::ToolChanged { .. } => EventKind::Tool,
            EditorEvent::ActiveLayerChanged { .. } => EventKind::ActiveLayer,
            EditorEvent::LayerChanged(_) => EventKind::Layer,
            EditorEvent::StrokeCommitted { .. } => EventKind::Stroke,
            EditorEvent::FillCompleted { .. } => EventKind::Fill,
            EditorEvent::HistoryChanged { .. } => EventKind::History,
            EditorEvent::Notice(_) => EventKind::Notice,
            EditorEvent::DocumentChanged(_) => EventKind::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added { layer_id: LayerId },
    Removed { layer_id: LayerId },
    Reordered { moved: LayerId, target: LayerId },
    VisibilityChanged { layer_id: LayerId, visible: bool },
    OpacityChanged { layer_id: LayerId, opacity: f32 },
    Renamed { layer_id: LayerId, name: String },
    ContentChanged { layer_id: LayerId },
    /// The whole list was replaced by undo or redo
    Restored,
}

/// Transient, user-facing messages. Nothing was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Painting was attempted on a hidden or missing layer
    LayerHidden,
    /// A bucket fill is still compositing
    FillPending,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::LayerHidden => "Layer is hidden",
            Notice::FillPending => "A fill is still in progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    Created { id: String },
    Loaded { id: String },
    Saved { id: String },
    SaveFailed { id: String, reason: String },
}
