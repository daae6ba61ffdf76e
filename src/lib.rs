//! # slirc-client
//!
//! An embeddable IRC client core for the RFC 1459 dialect. The library
//! mediates between a transport (TCP, optionally TLS) and application
//! code: received bytes become structured, typed events; typed send
//! requests become bytes. Applications register handlers per event
//! identity and can swap whole protocol implementations as modules.
//!
//! ## Architecture
//!
//! - [`Event`]: a polymorphic event carrying a stack of typed identities
//!   and a heterogeneous bag of tagged data ([`TagContainer`]). Handlers
//!   can promote an in-flight event to further identities; the dispatch
//!   loop picks them up in order.
//! - [`Irc`]: the context owning a thread-safe event queue, the handler
//!   registry (per identity, ordered by [`Phase`]), and the module
//!   registry (one implementation per API identity).
//! - [`Waitable`]: an edge-triggered gate worker threads block on, used by
//!   the context to signal queue non-emptiness.
//! - [`protocol`]: the RFC-1459 line splitter and the parser module that
//!   promotes raw lines into typed events.
//! - [`connection`]: the connection module (status machine, ingress line
//!   framing, gated egress) with an optional tokio transport driver
//!   behind the `tokio` feature (`tls` adds `ircs://` support).
//!
//! ## Quick start
//!
//! ```
//! use slirc_client::connection::{RawLine, RawLineEvent};
//! use slirc_client::protocol::{Numeric, NumericEvent, Rfc1459Parser};
//! use slirc_client::{Event, Irc, Phase};
//!
//! let irc = Irc::new();
//! irc.load(Rfc1459Parser::new)?;
//!
//! let _welcome = irc.attach::<NumericEvent>(Phase::Handler, |_, ev| {
//!     let numeric = ev.get_tag::<Numeric>()?;
//!     if numeric.number == 1 {
//!         println!("registered!");
//!     }
//!     Ok(())
//! });
//!
//! // Normally the connection module queues raw lines; inject one here.
//! let ev = Event::new::<RawLineEvent>();
//! ev.set_tag(RawLine {
//!     line: ":srv.example 001 nick :Welcome".to_string(),
//! });
//! irc.queue_event(ev);
//!
//! irc.run_pending()?;
//! # Ok::<(), slirc_client::ClientError>(())
//! ```
//!
//! ## Threading
//!
//! The event queue is thread-safe: transports feed it from their own
//! threads through [`QueueHandle`]. The rest of the context, from handler
//! registration to dispatch, is single-threaded and belongs to exactly
//! one worker:
//!
//! ```no_run
//! # use std::time::Duration;
//! # use slirc_client::Irc;
//! # let irc = Irc::new();
//! loop {
//!     irc.event_available().wait(Duration::from_secs(1));
//!     while let Some(ev) = irc.fetch_event() {
//!         irc.dispatch(&ev)?;
//!     }
//! }
//! # Ok::<(), slirc_client::ClientError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod connection;
mod context;
mod error;
mod event;
mod handler;
mod module;
pub mod protocol;
mod queue;
mod tag;
mod waitable;

pub use self::connection::{ClientConnection, ConnectionStatus, ServerTarget};
pub use self::context::Irc;
pub use self::error::{BoxError, ClientError, Result};
pub use self::event::{Event, EventId, EventKind, EventRef};
pub use self::handler::{HandlerHandle, Phase};
pub use self::module::{Module, ModuleApi};
pub use self::protocol::{irc_split, Rfc1459Parser};
pub use self::queue::QueueHandle;
pub use self::tag::TagContainer;
pub use self::waitable::Waitable;
