//! Thread-safe event queue shared between producers and the worker.
//!
//! The queue pairs a deque of event references with a [`Waitable`] that is
//! open exactly while the queue is non-empty, so a worker can block on
//! `event_available` and drain with `fetch_event`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::event::EventRef;
use crate::waitable::Waitable;

pub(crate) struct EventQueue {
    events: Mutex<VecDeque<EventRef>>,
    ready: Waitable,
}

impl EventQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(VecDeque::new()),
            // The queue starts out empty.
            ready: Waitable::closed(),
        })
    }

    pub(crate) fn push_back(&self, event: EventRef) {
        let mut events = self.events.lock().unwrap();
        events.push_back(event);
        self.ready.open();
    }

    pub(crate) fn push_front(&self, event: EventRef) {
        let mut events = self.events.lock().unwrap();
        events.push_front(event);
        self.ready.open();
    }

    pub(crate) fn pop(&self) -> Option<EventRef> {
        let mut events = self.events.lock().unwrap();
        let next = events.pop_front();
        // no else!
        if events.is_empty() {
            self.ready.close();
        }
        next
    }

    pub(crate) fn ready(&self) -> &Waitable {
        &self.ready
    }
}

/// Cloneable, thread-safe producer handle to a context's event queue.
///
/// I/O threads hold one of these to feed events into the context without
/// touching its single-threaded handler and module surface.
#[derive(Clone)]
pub struct QueueHandle {
    queue: Arc<EventQueue>,
}

impl QueueHandle {
    pub(crate) fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Queues an event at the tail of the queue.
    pub fn queue_event(&self, event: EventRef) {
        self.queue.push_back(event);
    }

    /// Queues an event at the head of the queue.
    pub fn queue_event_front(&self, event: EventRef) {
        self.queue.push_front(event);
    }

    /// The gate that is open while events are available.
    pub fn event_available(&self) -> &Waitable {
        self.queue.ready()
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("event_available", &self.queue.ready().is_open())
            .finish()
    }
}
