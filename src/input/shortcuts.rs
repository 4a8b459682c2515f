use egui::{Key, Modifiers};

/// A history navigation request from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Maps a key press to undo/redo.
///
/// Ctrl/Cmd+Z undoes, Ctrl/Cmd+Shift+Z and Ctrl/Cmd+Y redo. Anything else is `None`.
pub fn history_action(key: Key, modifiers: Modifiers) -> Option<HistoryAction> {
    let command = modifiers.ctrl || modifiers.mac_cmd || modifiers.command;
    if !command {
        return None;
    }

    match key {
        Key::Z if modifiers.shift => Some(HistoryAction::Redo),
        Key::Z => Some(HistoryAction::Undo),
        Key::Y => Some(HistoryAction::Redo),
        _ => None,
    }
}
