use std::cell::{Cell, RefCell};
use crate::event::{EditorEvent, EventHandler, EventKind};

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    /// Empty means every kind
    kinds: Vec<EventKind>,
    handler: Box<dyn EventHandler>,
}

impl Subscription {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Broadcasts editor events to subscribers, in subscription order.
pub struct EventBus {
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handler_count()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Subscribe a handler to every event.
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_to(&[], handler)
    }

    /// Subscribe a handler to the given kinds of event only. An empty slice
    /// subscribes to everything.
    pub fn subscribe_to(&self, kinds: &[EventKind], handler: Box<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            kinds: kinds.to_vec(),
            handler,
        });
        id
    }

    /// Removes a handler. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Emit an event to every handler subscribed to its kind.
    ///
    /// Handlers must not emit on the same bus from inside `handle_event`;
    /// such nested events are dropped with a warning.
    pub fn emit(&self, event: EditorEvent) {
        let Ok(mut subscriptions) = self.subscriptions.try_borrow_mut() else {
            log::warn!("Dropping nested event {event:?}");
            return;
        };
        let kind = event.kind();
        for subscription in subscriptions.iter_mut().filter(|s| s.wants(kind)) {
            subscription.handler.handle_event(&event);
        }
    }
}
