//! Connection handling: status machine, line framing, egress gating.
//!
//! The [`Connection`] API identity owns the link to the server. The
//! default implementation, [`ClientConnection`], is sans-IO: it tracks the
//! connection status, frames the ingress byte stream into
//! [`RawLineEvent`]s and gates outgoing writes, while the actual socket is
//! driven externally through the shared [`ConnLink`], either by the
//! caller's own I/O engine or by the tokio `driver` behind the `tokio`
//! feature.

mod framing;
mod link;
mod target;

#[cfg(feature = "tokio")]
pub mod driver;

pub use link::{ConnLink, Socket};
pub use target::{ServerTarget, DEFAULT_PORT};

use std::sync::Arc;

use crate::context::Irc;
use crate::error::Result;
use crate::event::EventKind;
use crate::module::{Module, ModuleApi};
use crate::tag::TagContainer;

/// Module API identity for IRC connections.
pub struct Connection;

impl ModuleApi for Connection {}

/// Status of a connection.
///
/// Valid transitions:
/// - `Disconnected -> Connecting` (attempting to establish a connection)
/// - `Connecting -> Connected` (connection attempt successful)
/// - `Connecting -> Disconnecting` (connection attempt being aborted)
/// - `Connecting -> Disconnected` (connection attempt failed)
/// - `Connected -> Disconnecting` (established connection shutting down)
/// - `Connected -> Disconnected` (unexpected connection loss)
/// - `Disconnecting -> Disconnected` (shutdown complete)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionStatus {
    /// No connection exists.
    #[default]
    Disconnected,
    /// The connection is currently being established.
    Connecting,
    /// The connection is established.
    Connected,
    /// The connection is shutting down.
    Disconnecting,
}

/// Event tag carrying the details of a status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// The previous connection status.
    pub old_status: ConnectionStatus,
    /// The new connection status.
    pub new_status: ConnectionStatus,
}

/// Event tag carrying one raw network line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLine {
    /// The raw IRC line, stripped of leading whitespace and the line
    /// ending delimiters.
    pub line: String,
}

/// Raised whenever the connection status changes.
pub struct StatusChangeEvent;

impl EventKind for StatusChangeEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<StatusChange>()
    }
}

/// Raised for every line received from the server.
pub struct RawLineEvent;

impl EventKind for RawLineEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<RawLine>()
    }
}

/// Default module handling the IRC server connection.
///
/// Occupies the [`Connection`] API identity.
///
/// ```
/// use slirc_client::connection::ClientConnection;
/// use slirc_client::Irc;
///
/// let irc = Irc::new();
/// let conn = irc.load(|irc| ClientConnection::new(irc, "ircs://irc.example.org:6697"))?;
/// assert!(conn.link().target().tls);
/// # Ok::<(), slirc_client::ClientError>(())
/// ```
pub struct ClientConnection {
    link: Arc<ConnLink>,
}

impl Module for ClientConnection {
    type Api = Connection;
}

impl ClientConnection {
    /// Sets up a connection handler for the given target.
    ///
    /// `target` uses the `[irc://|ircs://]host[:port]` syntax; see
    /// [`ServerTarget`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidTarget`](crate::ClientError::InvalidTarget)
    /// when the target does not parse.
    pub fn new(irc: &Irc, target: &str) -> Result<Self> {
        let target: ServerTarget = target.parse()?;
        Ok(Self {
            link: ConnLink::new(target, irc.queue_handle()),
        })
    }

    /// The shared link, for handing to a transport driver.
    pub fn link(&self) -> Arc<ConnLink> {
        self.link.clone()
    }

    /// Marks the start of a connection attempt.
    ///
    /// A transport must then be driven against [`link`](Self::link); with
    /// the `tokio` feature, `driver::run` performs both steps.
    pub fn connect(&self) -> bool {
        self.link.begin_connect()
    }

    /// Requests an orderly disconnect.
    pub fn disconnect(&self) {
        self.link.begin_disconnect();
    }

    /// The current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.link.status()
    }

    /// Sends data over the connection.
    ///
    /// Dropped silently unless connected; the caller appends the `\r\n`
    /// terminator.
    pub fn send(&self, data: &str) {
        self.link.send(data.as_bytes());
    }
}
