//! Events and their typed identities.
//!
//! An event is any action happening in an IRC context. Events are specified
//! by a stack of typed identities and the data tags attached to them; an
//! event can take on further identities during its life. A raw network
//! line, for example, becomes a [`ParsedEvent`](crate::protocol::ParsedEvent)
//! after protocol parsing and then a
//! [`NumericEvent`](crate::protocol::NumericEvent) once the command is
//! recognized, with each stage's handlers seeing the same event object.

use std::any::{type_name, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::tag::TagContainer;

/// A typed event identity.
///
/// Declare an identity by implementing this trait on a unit type. An
/// identity may declare a tag precondition: the set of tags an event must
/// carry before handlers for this identity run. Preconditions are asserted
/// in checked builds and elided in release builds.
///
/// ```
/// use slirc_client::{EventKind, TagContainer};
///
/// struct LagSample {
///     millis: u64,
/// }
///
/// struct LagMeasuredEvent;
///
/// impl EventKind for LagMeasuredEvent {
///     fn check_tags(data: &TagContainer) -> bool {
///         data.contains::<LagSample>()
///     }
/// }
/// ```
pub trait EventKind: 'static {
    /// Tag precondition for this identity.
    ///
    /// The default accepts any tag set.
    fn check_tags(_data: &TagContainer) -> bool {
        true
    }
}

/// Runtime token for an event identity.
///
/// Two ids are equal iff they denote the same [`EventKind`] type. The id
/// also carries the identity's display name and tag precondition so the
/// dispatcher can check and report without further lookups.
#[derive(Clone, Copy)]
pub struct EventId {
    token: TypeId,
    name: &'static str,
    check: fn(&TagContainer) -> bool,
}

impl EventId {
    /// The id of identity `K`.
    pub fn of<K: EventKind>() -> Self {
        Self {
            token: TypeId::of::<K>(),
            name: type_name::<K>(),
            check: K::check_tags,
        }
    }

    /// Stable type token of this identity.
    pub fn token(&self) -> TypeId {
        self.token
    }

    /// Full type name of this identity.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unqualified type name, for display.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    pub(crate) fn check(&self) -> fn(&TagContainer) -> bool {
        self.check
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for EventId {}

impl Hash for EventId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl std::fmt::Debug for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

struct EventState {
    /// Append-only identity history.
    history: Vec<EventId>,
    /// Index of the identity currently being handled.
    cursor: usize,
    data: TagContainer,
}

/// Shared handle to an [`Event`].
pub type EventRef = Arc<Event>;

/// A polymorphic event: an ordered identity history plus attached tags.
///
/// The history only grows, and the dispatch cursor only moves forward.
/// Identities before the cursor are *past* ([`was_a`](Self::was_a)), the
/// identity under it is *present* ([`is_a`](Self::is_a)), and identities
/// after it are *future* ([`will_be_a`](Self::will_be_a)).
///
/// Internal state sits behind a mutex so producer threads can stage tags
/// before queueing; during dispatch only the dispatching thread should
/// mutate the event.
pub struct Event {
    state: Mutex<EventState>,
}

impl Event {
    /// Creates a new event with the given initial identity.
    pub fn new<K: EventKind>() -> EventRef {
        Arc::new(Self {
            state: Mutex::new(EventState {
                history: vec![EventId::of::<K>()],
                cursor: 0,
                data: TagContainer::new(),
            }),
        })
    }

    /// Queues another identity for this event.
    ///
    /// Further identities are handled after all handlers for the current
    /// one have run. When `allow_duplicate` is `false` (the usual case),
    /// an identity that is already queued for the future is not appended
    /// again and `false` is returned.
    pub fn queue_as<K: EventKind>(&self, allow_duplicate: bool) -> bool {
        let mut state = self.state.lock().unwrap();
        let id = EventId::of::<K>();
        let already_queued = state
            .history
            .get(state.cursor + 1..)
            .is_some_and(|future| Self::contains(future, id));
        if !allow_duplicate && already_queued {
            return false;
        }
        state.history.push(id);
        true
    }

    /// Whether this event has already been handled as `K`.
    pub fn was_a<K: EventKind>(&self) -> bool {
        let state = self.state.lock().unwrap();
        Self::contains(&state.history[..state.cursor], EventId::of::<K>())
    }

    /// Whether this event is currently being handled as `K`.
    pub fn is_a<K: EventKind>(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.cursor < state.history.len() && state.history[state.cursor] == EventId::of::<K>()
    }

    /// Whether this event is queued to be handled as `K`.
    pub fn will_be_a<K: EventKind>(&self) -> bool {
        let state = self.state.lock().unwrap();
        if state.cursor >= state.history.len() {
            return false;
        }
        Self::contains(&state.history[state.cursor + 1..], EventId::of::<K>())
    }

    fn contains(slice: &[EventId], id: EventId) -> bool {
        slice.iter().any(|entry| *entry == id)
    }

    /// Snapshot of the identity history.
    pub fn history(&self) -> Vec<EventId> {
        self.state.lock().unwrap().history.clone()
    }

    /// The identity under the dispatch cursor, if any.
    pub(crate) fn current(&self) -> Option<EventId> {
        let state = self.state.lock().unwrap();
        state.history.get(state.cursor).copied()
    }

    /// Moves the dispatch cursor past the current identity.
    pub(crate) fn advance(&self) {
        let mut state = self.state.lock().unwrap();
        if state.cursor < state.history.len() {
            state.cursor += 1;
        }
    }

    /// Runs `f` on the event's tag container.
    pub fn with_data<R>(&self, f: impl FnOnce(&mut TagContainer) -> R) -> R {
        f(&mut self.state.lock().unwrap().data)
    }

    /// Attaches a tag, replacing any existing tag of the same type.
    pub fn set_tag<T: std::any::Any + Send>(&self, tag: T) {
        self.with_data(|data| {
            data.set(tag);
        });
    }

    /// Runs `f` on the tag of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoTag`](crate::ClientError::NoTag) if the tag
    /// is absent.
    pub fn with_tag<T: std::any::Any + Send, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.with_data(|data| data.try_get::<T>().map(f))
    }

    /// Returns a clone of the tag of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoTag`](crate::ClientError::NoTag) if the tag
    /// is absent.
    pub fn get_tag<T: std::any::Any + Send + Clone>(&self) -> Result<T> {
        self.with_tag(T::clone)
    }

    /// Whether a tag of type `T` is attached.
    pub fn has_tag<T: std::any::Any + Send>(&self) -> bool {
        self.with_data(|data| data.contains::<T>())
    }

    /// Evaluates an identity's tag precondition against this event's tags.
    pub(crate) fn satisfies(&self, check: fn(&TagContainer) -> bool) -> bool {
        let state = self.state.lock().unwrap();
        check(&state.data)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("Event")
            .field("history", &state.history)
            .field("cursor", &state.cursor)
            .field("tags", &state.data.len())
            .finish()
    }
}
