//! Edge-triggered gates for blocking worker threads.
//!
//! A [`Waitable`] is a boolean gate carrying a list of one-shot callbacks.
//! While open, waits return instantly and new callbacks fire immediately.
//! While closed, waits block until some gate in the wait set opens or the
//! timeout expires. The context uses one internally to signal queue
//! non-emptiness; workers can combine several gates in a single wait.

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::Duration;

type Callback = Box<dyn FnOnce() + Send>;

struct GateState {
    is_open: bool,
    callbacks: Vec<Callback>,
}

/// An edge-triggered gate usable as a condition for blocking a worker.
///
/// All operations are safe from any thread. Callbacks are invoked outside
/// the internal lock, so a callback may re-enter the same gate without
/// deadlocking.
pub struct Waitable {
    state: Mutex<GateState>,
}

impl Waitable {
    /// Creates a gate in the open state.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                is_open: true,
                callbacks: Vec::new(),
            }),
        }
    }

    /// Creates a gate in the closed state.
    pub fn closed() -> Self {
        let gate = Self::new();
        gate.close();
        gate
    }

    /// Returns `true` if the gate is currently open.
    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().is_open
    }

    /// Opens the gate, waking pending waits.
    ///
    /// All currently registered callbacks are invoked exactly once, in
    /// registration order, and the callback list is cleared. While open,
    /// new waits return instantly.
    pub fn open(&self) {
        let pending = {
            let mut state = self.state.lock().unwrap();
            state.is_open = true;
            std::mem::take(&mut state.callbacks)
        };
        for callback in pending {
            callback();
        }
    }

    /// Closes the gate.
    ///
    /// Has no callback side effects; pending waits keep blocking until some
    /// gate they wait on is opened, or until they time out.
    pub fn close(&self) {
        self.state.lock().unwrap().is_open = false;
    }

    /// Registers a one-shot callback to run when the gate opens.
    ///
    /// If the gate is already open the callback fires immediately on the
    /// calling thread.
    pub fn on_open(&self, callback: impl FnOnce() + Send + 'static) {
        if let Err(callback) = self.try_register(Box::new(callback)) {
            callback();
        }
    }

    /// Registers a callback unless the gate is open.
    ///
    /// Hands the callback back when the gate is open (nothing registered;
    /// the caller decides whether to fire it).
    fn try_register(&self, callback: Callback) -> std::result::Result<(), Callback> {
        let mut state = self.state.lock().unwrap();
        if state.is_open {
            return Err(callback);
        }
        state.callbacks.push(callback);
        Ok(())
    }

    /// Waits for at most `timeout` for any gate in `gates` to be open.
    ///
    /// Each gate is checked in iteration order; if one is already open its
    /// index is returned immediately. Otherwise the call blocks until a
    /// gate opens or the timeout expires, returning the index of the gate
    /// that woke the wait, or `None` on timeout.
    pub fn wait_any(gates: &[&Waitable], timeout: Duration) -> Option<usize> {
        if gates.is_empty() {
            return None;
        }

        struct Shared {
            woken: Mutex<Option<usize>>,
            cond: Condvar,
        }

        let shared = Arc::new(Shared {
            woken: Mutex::new(None),
            cond: Condvar::new(),
        });

        for (index, gate) in gates.iter().enumerate() {
            let weak: Weak<Shared> = Arc::downgrade(&shared);
            let registered = gate.try_register(Box::new(move || {
                // Late fires from finished waits are no-ops.
                if let Some(shared) = weak.upgrade() {
                    let mut woken = shared.woken.lock().unwrap();
                    if woken.is_none() {
                        *woken = Some(index);
                    }
                    shared.cond.notify_all();
                }
            }));
            if registered.is_err() {
                return Some(index);
            }
        }

        let guard = shared.woken.lock().unwrap();
        let (guard, _timeout_result) = shared
            .cond
            .wait_timeout_while(guard, timeout, |woken| woken.is_none())
            .unwrap();
        *guard
    }

    /// Waits for at most `timeout` for this gate to be open.
    ///
    /// Returns `true` if the gate became (or already was) open, `false` on
    /// timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        Waitable::wait_any(&[self], timeout) == Some(0)
    }
}

impl Default for Waitable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Waitable {
    fn drop(&mut self) {
        // Wake pending waits before release; a dropped gate counts as
        // having become available.
        let pending = std::mem::take(&mut self.state.lock().unwrap().callbacks);
        for callback in pending {
            callback();
        }
    }
}

impl std::fmt::Debug for Waitable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waitable")
            .field("is_open", &self.is_open())
            .finish()
    }
}
