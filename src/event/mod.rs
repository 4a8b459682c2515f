mod bus;
mod events;

pub use bus::{EventBus, SubscriptionId};
pub use events::{DocumentEvent, EditorEvent, EventKind, LayerEvent, Notice};

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}

/// Any `FnMut(&EditorEvent)` closure can subscribe directly.
impl<F> EventHandler for F
where
    F: FnMut(&EditorEvent) + Send,
{
    fn handle_event(&mut self, event: &EditorEvent) {
        self(event)
    }
}
