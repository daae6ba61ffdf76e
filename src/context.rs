//! The IRC context: queue, handler registry, dispatch, module lifecycle.
//!
//! The context is the combining piece for managing one IRC connection. Its
//! surface splits in two: the event queue is thread-safe and shared with
//! producers through [`QueueHandle`], while handler and module management
//! (and dispatch itself) are single-threaded and belong to the worker.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{BoxError, ClientError, Result};
use crate::event::{EventKind, EventRef};
use crate::handler::{HandlerHandle, HandlerMap, Phase, SharedHandlerMap};
use crate::module::{LoadedModule, Module, ModuleApi};
use crate::queue::{EventQueue, QueueHandle};
use crate::waitable::Waitable;

/// The main context for an IRC connection.
///
/// A typical deployment runs one worker thread that owns the context and
/// loops over the queue, while transport threads feed it through a
/// [`QueueHandle`]:
///
/// ```
/// use std::time::Duration;
/// use slirc_client::{Event, EventKind, Irc, Phase};
///
/// struct TickEvent;
/// impl EventKind for TickEvent {}
///
/// let irc = Irc::new();
/// let _tick = irc.attach::<TickEvent>(Phase::Handler, |_, _| {
///     println!("tick");
///     Ok(())
/// });
///
/// irc.queue_event(Event::new::<TickEvent>());
///
/// while irc.event_available().wait(Duration::from_millis(0)) {
///     while let Some(ev) = irc.fetch_event() {
///         irc.dispatch(&ev)?;
///     }
/// }
/// # Ok::<(), slirc_client::ClientError>(())
/// ```
///
/// Concurrent workers on the same context are not supported; dispatch,
/// attach/detach and load/unload must be serialized by the caller.
pub struct Irc {
    queue: Arc<EventQueue>,
    handlers: SharedHandlerMap,
    modules: RefCell<HashMap<TypeId, LoadedModule>>,
}

impl Irc {
    /// Creates an empty IRC context.
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            handlers: Rc::new(RefCell::new(HandlerMap::default())),
            modules: RefCell::new(HashMap::new()),
        }
    }

    ///////////////////////////////////////////////////////////////////////
    // Event queue API

    /// A cloneable, thread-safe producer handle to this context's queue.
    pub fn queue_handle(&self) -> QueueHandle {
        QueueHandle::new(self.queue.clone())
    }

    /// Queues an event at the tail of the event queue.
    ///
    /// Thread-safe via [`queue_handle`](Self::queue_handle) as well.
    pub fn queue_event(&self, event: EventRef) {
        self.queue.push_back(event);
    }

    /// Queues an event at the head of the event queue.
    pub fn queue_event_front(&self, event: EventRef) {
        self.queue.push_front(event);
    }

    /// Tries to fetch an event from the queue without blocking.
    ///
    /// To wait for an event, wait on [`event_available`](Self::event_available)
    /// before fetching.
    pub fn fetch_event(&self) -> Option<EventRef> {
        self.queue.pop()
    }

    /// Gate that is open while events are available in the queue.
    ///
    /// If multiple threads wait on the same queue they are all woken when
    /// an event arrives, but only one is guaranteed to fetch it.
    pub fn event_available(&self) -> &Waitable {
        self.queue.ready()
    }

    ///////////////////////////////////////////////////////////////////////
    // Event handler API

    /// Attaches an event handler for identity `K` at the given phase.
    ///
    /// `K`'s tag precondition is recorded on first attach and asserted
    /// (in checked builds) before handlers for `K` run. The registration
    /// lives until the returned handle is dropped or disconnected.
    pub fn attach<K: EventKind>(
        &self,
        phase: Phase,
        handler: impl Fn(&Irc, &EventRef) -> Result<(), BoxError> + 'static,
    ) -> HandlerHandle {
        let id = crate::event::EventId::of::<K>();
        let seq = self
            .handlers
            .borrow_mut()
            .attach(id, phase, Rc::new(handler));
        HandlerHandle::new(&self.handlers, id.token(), seq)
    }

    /// Dispatches an event through all of its remaining identities.
    ///
    /// For each identity from the cursor onwards, all subscribed handlers
    /// run in phase then registration order before the cursor advances.
    /// Handlers may append further identities ([`Event::queue_as`]), which
    /// the loop picks up, and may re-queue the event for future fetches.
    ///
    /// # Errors
    ///
    /// A handler failure is returned as [`ClientError::Handler`]. The
    /// cursor advances after each identity completes, so on failure it
    /// still points at the failing identity; identities already dispatched
    /// stay past. The event is surrendered to the caller.
    pub fn dispatch(&self, event: &EventRef) -> Result<()> {
        while let Some(id) = event.current() {
            let callbacks = {
                let handlers = self.handlers.borrow();
                handlers.slot(id.token()).map(|slot| {
                    debug_assert!(
                        event.satisfies(slot.check()),
                        "event dispatched as {} without its required tags",
                        slot.name()
                    );
                    slot.callbacks()
                })
            };

            if let Some(callbacks) = callbacks {
                trace!(event = id.short_name(), handlers = callbacks.len(), "dispatching");
                for callback in callbacks {
                    callback(self, event).map_err(|source| ClientError::Handler {
                        event: id.name(),
                        source,
                    })?;
                }
            }

            event.advance();
        }
        Ok(())
    }

    /// Fetches and dispatches until the queue is empty.
    ///
    /// Returns the number of events dispatched. On a handler failure the
    /// failing event is dropped in the state dispatch left it and the
    /// error is returned; remaining events stay queued.
    pub fn run_pending(&self) -> Result<usize> {
        let mut dispatched = 0;
        while let Some(event) = self.fetch_event() {
            self.dispatch(&event)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    ///////////////////////////////////////////////////////////////////////
    // Module API

    /// Loads a module into the context.
    ///
    /// Any module currently occupying the same API identity is unloaded
    /// first. The `init` closure constructs the module bound to this
    /// context (typically attaching its handlers).
    ///
    /// # Errors
    ///
    /// Propagates the error of `init`; in that case the previous module is
    /// already gone and the API identity is left vacant.
    pub fn load<M, F>(&self, init: F) -> Result<Rc<M>>
    where
        M: Module,
        F: FnOnce(&Irc) -> Result<M>,
    {
        let api = TypeId::of::<M::Api>();
        // Unload-then-load: destroy the previous occupant before the new
        // module attaches its handlers.
        self.modules.borrow_mut().remove(&api);

        let module = Rc::new(init(self)?);
        debug!(api = M::Api::name(), "module loaded");
        self.modules.borrow_mut().insert(
            api,
            LoadedModule {
                instance: module.clone(),
                name: M::Api::name(),
            },
        );
        Ok(module)
    }

    /// Unloads the module occupying API identity `A`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoModule`] if no module is loaded for `A`.
    pub fn unload<A: ModuleApi>(&self) -> Result<()> {
        self.modules
            .borrow_mut()
            .remove(&TypeId::of::<A>())
            .map(|_| debug!(api = A::name(), "module unloaded"))
            .ok_or(ClientError::NoModule { api: A::name() })
    }

    /// Fetches the loaded module of concrete type `M`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoModule`] if `M`'s API identity is vacant
    /// or occupied by a different implementation.
    pub fn module<M: Module>(&self) -> Result<Rc<M>> {
        let modules = self.modules.borrow();
        let loaded = modules
            .get(&TypeId::of::<M::Api>())
            .ok_or(ClientError::NoModule {
                api: M::Api::name(),
            })?;
        loaded
            .instance
            .clone()
            .downcast::<M>()
            .map_err(|_| ClientError::NoModule {
                api: M::Api::name(),
            })
    }
}

impl Default for Irc {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Irc {
    fn drop(&mut self) {
        // Modules detach their handlers while the handler map is alive;
        // unload order is arbitrary.
        self.modules.borrow_mut().clear();
    }
}

impl std::fmt::Debug for Irc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Irc")
            .field("event_available", &self.event_available().is_open())
            .field(
                "modules",
                &self
                    .modules
                    .borrow()
                    .values()
                    .map(|m| m.name)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
