//! Handler registration and phase ordering.
//!
//! Handlers subscribe to one event identity at a [`Phase`]; within an
//! identity they run in ascending phase order, ties broken by registration
//! order. Registrations are owned by [`HandlerHandle`]s: dropping or
//! disconnecting the handle removes the handler.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::BoxError;
use crate::event::{EventId, EventRef};
use crate::tag::TagContainer;

/// The queue in which a handler is executed relative to others for the
/// same event identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Runs before all main event handlers.
    Prefilter,
    /// Runs together with the main event handlers.
    Handler,
    /// Runs after all main event handlers.
    Postfilter,
}

impl Phase {
    pub(crate) fn rank(self) -> i16 {
        match self {
            Phase::Prefilter => -0x10,
            Phase::Handler => 0x00,
            Phase::Postfilter => 0x10,
        }
    }
}

pub(crate) type HandlerFn = Rc<dyn Fn(&crate::context::Irc, &EventRef) -> Result<(), BoxError>>;

struct Entry {
    rank: i16,
    seq: u64,
    callback: HandlerFn,
}

pub(crate) struct Slot {
    /// Tag precondition, recorded on first attach for the identity.
    check: fn(&TagContainer) -> bool,
    name: &'static str,
    entries: Vec<Entry>,
}

impl Slot {
    pub(crate) fn check(&self) -> fn(&TagContainer) -> bool {
        self.check
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Snapshot of the callbacks in execution order.
    ///
    /// Cloned out so handlers may attach or detach while the snapshot is
    /// being executed; such changes affect later dispatches only.
    pub(crate) fn callbacks(&self) -> Vec<HandlerFn> {
        self.entries.iter().map(|e| e.callback.clone()).collect()
    }
}

#[derive(Default)]
pub(crate) struct HandlerMap {
    slots: HashMap<TypeId, Slot>,
    next_seq: u64,
}

pub(crate) type SharedHandlerMap = Rc<RefCell<HandlerMap>>;

impl HandlerMap {
    pub(crate) fn attach(&mut self, id: EventId, phase: Phase, callback: HandlerFn) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let slot = self.slots.entry(id.token()).or_insert_with(|| Slot {
            check: id.check(),
            name: id.name(),
            entries: Vec::new(),
        });

        let rank = phase.rank();
        // Stable within a phase: seq numbers only grow.
        let pos = slot.entries.partition_point(|e| e.rank <= rank);
        slot.entries.insert(
            pos,
            Entry {
                rank,
                seq,
                callback,
            },
        );
        trace!(event = id.short_name(), ?phase, seq, "handler attached");
        seq
    }

    pub(crate) fn detach(&mut self, token: TypeId, seq: u64) {
        if let Some(slot) = self.slots.get_mut(&token) {
            slot.entries.retain(|e| e.seq != seq);
        }
    }

    pub(crate) fn slot(&self, token: TypeId) -> Option<&Slot> {
        self.slots.get(&token)
    }
}

/// Owner of one handler registration.
///
/// The registration is removed when the handle is dropped or explicitly
/// [`disconnect`](Self::disconnect)ed.
#[must_use = "dropping the handle detaches the handler"]
pub struct HandlerHandle {
    map: Weak<RefCell<HandlerMap>>,
    token: TypeId,
    seq: u64,
}

impl HandlerHandle {
    pub(crate) fn new(map: &SharedHandlerMap, token: TypeId, seq: u64) -> Self {
        Self {
            map: Rc::downgrade(map),
            token,
            seq,
        }
    }

    /// Removes the registration now instead of at drop time.
    pub fn disconnect(&mut self) {
        if let Some(map) = self.map.upgrade() {
            map.borrow_mut().detach(self.token, self.seq);
        }
        self.map = Weak::new();
    }
}

impl Drop for HandlerHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for HandlerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerHandle")
            .field("seq", &self.seq)
            .field("connected", &(self.map.strong_count() > 0))
            .finish()
    }
}
