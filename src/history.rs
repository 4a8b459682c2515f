use crate::document::LayerList;

/// Default cap on the number of history entries.
pub const MAX_HISTORY_LENGTH: usize = 50;

/// Bounded, truncating undo/redo log of whole layer-list snapshots.
///
/// A plain value: `entries` plus a `cursor` pointing at the live state.
/// Invariants: `entries` is never empty, `cursor < entries.len()`,
/// `entries.len() <= max_len`.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<LayerList>,
    cursor: usize,
    max_len: usize,
}

impl History {
    /// A log holding only `initial`, with the default length cap.
    pub fn new(initial: LayerList) -> Self {
        Self::with_max_len(initial, MAX_HISTORY_LENGTH)
    }

    pub fn with_max_len(initial: LayerList, max_len: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            max_len: max_len.max(1),
        }
    }

    /// Records a new live state. Drops every redo entry past the cursor,
    /// then evicts the oldest entries beyond the cap.
    pub fn commit(&mut self, snapshot: LayerList) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);

        if self.entries.len() > self.max_len {
            let excess = self.entries.len() - self.max_len;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        log::debug!("History commit: {} entries", self.entries.len());
    }

    /// Steps back one entry and returns the state to restore, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&LayerList> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        log::debug!("Undo to history entry {}", self.cursor);
        Some(&self.entries[self.cursor])
    }

    /// Steps forward one entry and returns the state to restore, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&LayerList> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        log::debug!("Redo to history entry {}", self.cursor);
        Some(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> &LayerList {
        &self.entries[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[LayerList] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}
