//! Shared connection state between the module surface and the transport.
//!
//! The [`ConnLink`] is the `Send + Sync` half of the connection module: it
//! owns the status machine, the ingress line buffer and the egress socket
//! handle under one mutex, and feeds events into the context through a
//! [`QueueHandle`]. The transport driver holds an `Arc<ConnLink>` and
//! reports lifecycle changes through it.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::event::{Event, EventRef};
use crate::queue::QueueHandle;

use super::framing::LineBuffer;
use super::target::ServerTarget;
use super::{ConnectionStatus, RawLine, RawLineEvent, StatusChange, StatusChangeEvent};

/// Egress seam between the connection module and a transport.
///
/// Implementations forward writes to the underlying socket. `send` is only
/// invoked while the connection is in [`ConnectionStatus::Connected`].
pub trait Socket: Send {
    /// Writes raw bytes to the transport.
    fn send(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Initiates an orderly shutdown of the transport.
    fn shutdown(&mut self) -> std::io::Result<()>;
}

struct LinkState {
    status: ConnectionStatus,
    lines: LineBuffer,
    socket: Option<Box<dyn Socket>>,
}

/// Thread-safe connection state shared with the transport driver.
pub struct ConnLink {
    target: ServerTarget,
    queue: QueueHandle,
    state: Mutex<LinkState>,
}

impl ConnLink {
    pub(crate) fn new(target: ServerTarget, queue: QueueHandle) -> Arc<Self> {
        Arc::new(Self {
            target,
            queue,
            state: Mutex::new(LinkState {
                status: ConnectionStatus::Disconnected,
                lines: LineBuffer::new(),
                socket: None,
            }),
        })
    }

    /// The parsed connection target.
    pub fn target(&self) -> &ServerTarget {
        &self.target
    }

    /// The current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().unwrap().status
    }

    /// Marks the start of a connection attempt.
    ///
    /// Returns `false` (and does nothing) unless the connection is
    /// currently [`ConnectionStatus::Disconnected`].
    pub fn begin_connect(&self) -> bool {
        self.transition(|status| match status {
            ConnectionStatus::Disconnected => Some(ConnectionStatus::Connecting),
            _ => None,
        })
    }

    /// Hands the established transport to the connection.
    ///
    /// Returns `false` when the attempt has been aborted in the meantime;
    /// the socket is shut down and discarded in that case, and the driver
    /// should report [`transport_closed`](Self::transport_closed) once the
    /// stream ends.
    pub fn transport_connected(&self, mut socket: Box<dyn Socket>) -> bool {
        let change = {
            let mut state = self.state.lock().unwrap();
            if state.status == ConnectionStatus::Connecting {
                state.socket = Some(socket);
                Some(Self::set_status(&mut state, ConnectionStatus::Connected))
            } else {
                if let Err(error) = socket.shutdown() {
                    warn!(%error, "shutdown of rejected transport failed");
                }
                None
            }
        };
        match change {
            Some(ev) => {
                self.queue.queue_event(ev);
                true
            }
            None => false,
        }
    }

    /// Reports that the transport is gone (EOF, error, or shutdown done).
    pub fn transport_closed(&self) {
        let change = {
            let mut state = self.state.lock().unwrap();
            state.socket = None;
            (state.status != ConnectionStatus::Disconnected)
                .then(|| Self::set_status(&mut state, ConnectionStatus::Disconnected))
        };
        if let Some(ev) = change {
            self.queue.queue_event(ev);
        }
    }

    /// Requests an orderly disconnect.
    pub fn begin_disconnect(&self) {
        let changed = self.transition(|status| match status {
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                Some(ConnectionStatus::Disconnecting)
            }
            _ => None,
        });
        if changed {
            let mut state = self.state.lock().unwrap();
            if let Some(socket) = state.socket.as_mut() {
                if let Err(error) = socket.shutdown() {
                    warn!(%error, "transport shutdown failed");
                }
            }
        }
    }

    /// Feeds received bytes into the ingress line buffer.
    ///
    /// Every completed non-empty line is queued as a [`RawLineEvent`].
    pub fn receive(&self, bytes: &[u8]) {
        let lines = {
            let mut state = self.state.lock().unwrap();
            state.lines.extend(bytes);
            let mut lines = Vec::new();
            while let Some(line) = state.lines.next_line() {
                lines.push(line);
            }
            lines
        };

        for line in lines {
            let ev = Event::new::<RawLineEvent>();
            ev.set_tag(RawLine { line });
            self.queue.queue_event(ev);
        }
    }

    /// Sends raw bytes over the transport.
    ///
    /// Silently dropped unless the connection is
    /// [`ConnectionStatus::Connected`]. The caller is responsible for the
    /// trailing `\r\n`.
    pub fn send(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        if state.status != ConnectionStatus::Connected {
            return;
        }
        if let Some(socket) = state.socket.as_mut() {
            if let Err(error) = socket.send(data) {
                warn!(%error, "transport write failed");
            }
        }
    }

    /// Applies a status transition and queues a status change event when
    /// the status actually changed.
    fn transition(&self, next: impl FnOnce(ConnectionStatus) -> Option<ConnectionStatus>) -> bool {
        let change: Option<EventRef> = {
            let mut state = self.state.lock().unwrap();
            match next(state.status) {
                Some(new_status) if new_status != state.status => {
                    Some(Self::set_status(&mut state, new_status))
                }
                _ => None,
            }
        };

        match change {
            Some(ev) => {
                self.queue.queue_event(ev);
                true
            }
            None => false,
        }
    }

    /// Records a status change and builds the event announcing it.
    ///
    /// Caller holds the state lock and queues the event after release.
    fn set_status(state: &mut LinkState, new_status: ConnectionStatus) -> EventRef {
        let old_status = state.status;
        state.status = new_status;
        debug!(?old_status, ?new_status, "connection status changed");
        let ev = Event::new::<StatusChangeEvent>();
        ev.set_tag(StatusChange {
            old_status,
            new_status,
        });
        ev
    }
}

impl std::fmt::Debug for ConnLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnLink")
            .field("target", &self.target)
            .field("status", &self.status())
            .finish()
    }
}
