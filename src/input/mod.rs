use egui::{PointerButton, Pos2};

mod shortcuts;
pub use shortcuts::{HistoryAction, history_action};

/// Pointer input in document pixel coordinates.
///
/// While a stroke is in progress, `Move`/`Up`/`Leave` come from the pointer
/// capture source and may lie outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// A button was pressed over the canvas
    Down { pos: Pos2, button: PointerButton },
    /// The pointer moved (with or without buttons held)
    Move { pos: Pos2 },
    /// A button was released
    Up { pos: Pos2, button: PointerButton },
    /// Tracking of the pointer was lost (left the window)
    Leave { last_known: Pos2 },
    /// The platform cancelled the gesture
    Cancel,
}

impl PointerEvent {
    pub fn position(&self) -> Option<Pos2> {
        match self {
            PointerEvent::Down { pos, .. }
            | PointerEvent::Move { pos }
            | PointerEvent::Up { pos, .. } => Some(*pos),
            PointerEvent::Leave { last_known } => Some(*last_known),
            PointerEvent::Cancel => None,
        }
    }
}
