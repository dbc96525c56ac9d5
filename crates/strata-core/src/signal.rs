//! Signal/slot system for Strata.
//!
//! This module provides a type-safe signal/slot mechanism for communication
//! between layers of a grid stack. Signals are emitted by a layer when its
//! state changes, and connected slots (callbacks) are invoked in response.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The main signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Invocation Model
//!
//! Emission is synchronous and direct: every connected slot runs on the
//! emitting thread, inside the call stack that triggered the mutation,
//! before [`Signal::emit`] returns. There is no queueing and no background
//! delivery. A grid stack is mutated and queried from a single owning
//! thread; the signal storage itself is still `Send + Sync` so a stack can
//! be owned behind an `Arc` and handed between threads as a whole.
//!
//! # Example
//!
//! ```
//! use strata_core::Signal;
//!
//! let count_changed = Signal::<usize>::new();
//!
//! let conn_id = count_changed.connect(|count| {
//!     println!("Count is now {count}");
//! });
//!
//! count_changed.emit(7);
//! count_changed.disconnect(conn_id).unwrap();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::error::SignalError;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via
    /// [`Signal::disconnect`]. The ID remains valid until the connection is
    /// explicitly disconnected or the signal is dropped.
    pub struct ConnectionId;
}

/// Internal storage for a single connection.
struct Connection<Args> {
    /// The slot function to invoke (Arc-wrapped so emission can run outside
    /// the connection lock).
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
}

/// A type-safe signal that can have multiple connected slots.
///
/// When a signal is emitted, all connected slots are invoked immediately
/// with a reference to the provided arguments, in connection order.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for
///   signals with no arguments, or a tuple like `(usize, usize)` for
///   multiple arguments.
///
/// # Reentrancy
///
/// Slots may connect or disconnect other slots, and may emit further
/// signals (including this one). Emission iterates over a snapshot of the
/// connections taken at emit time, so mutation during delivery never
/// deadlocks and never affects the in-flight emission.
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// The slot is invoked synchronously on the emitting thread each time
    /// the signal is emitted. Returns a [`ConnectionId`] that can be used
    /// to disconnect the slot later.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {s}"));
    /// signal.emit("Hello".to_string());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Connection {
            slot: Arc::new(slot),
        })
    }

    /// Connect a slot and return an RAII guard that disconnects on drop.
    ///
    /// This is the preferred way for observers with a shorter lifetime than
    /// the signal: dropping the guard removes the connection, so the slot
    /// can never fire against freed state.
    pub fn connect_guarded<F>(self: &Arc<Self>, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: Arc::downgrade(self),
            id,
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Fails with [`SignalError::InvalidConnection`] if the ID was never
    /// issued by this signal or has already been disconnected.
    pub fn disconnect(&self, id: ConnectionId) -> Result<(), SignalError> {
        self.connections
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or(SignalError::InvalidConnection)
    }

    /// Disconnect all slots.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Returns the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns `true` if the signal has no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Block or unblock emission.
    ///
    /// While blocked, [`emit`](Self::emit) is a no-op. Returns the previous
    /// blocked state so callers can restore it.
    pub fn set_blocked(&self, blocked: bool) -> bool {
        self.blocked.swap(blocked, Ordering::AcqRel)
    }

    /// Returns `true` if emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Emit the signal, invoking every connected slot with `args`.
    ///
    /// Slots run in connection order, synchronously, before this call
    /// returns. Does nothing while the signal is blocked.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            return;
        }

        // Snapshot the slots so connect/disconnect from inside a slot does
        // not deadlock on the connection lock.
        let slots: Vec<Arc<dyn Fn(&Args) + Send + Sync>> = {
            let connections = self.connections.lock();
            connections.values().map(|c| Arc::clone(&c.slot)).collect()
        };

        tracing::trace!(
            target: crate::logging::targets::SIGNAL,
            slots = slots.len(),
            "emitting signal"
        );

        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

/// RAII guard for a signal connection.
///
/// Dropping the guard disconnects the slot. The guard holds a weak
/// reference to the signal, so it never keeps the signal alive by itself.
pub struct ConnectionGuard<Args> {
    signal: std::sync::Weak<Signal<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// Returns the connection ID held by this guard.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Disconnect now and consume the guard.
    ///
    /// Fails with [`SignalError::SignalDropped`] if the signal no longer
    /// exists, or [`SignalError::InvalidConnection`] if the slot was
    /// already removed.
    pub fn disconnect(self) -> Result<(), SignalError> {
        let result = match self.signal.upgrade() {
            Some(signal) => signal.disconnect(self.id),
            None => Err(SignalError::SignalDropped),
        };
        std::mem::forget(self);
        result
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.upgrade() {
            let _ = signal.disconnect(self.id);
        }
    }
}

static_assertions::assert_impl_all!(Signal<usize>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_invokes_slot() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(AtomicUsize::new(0));

        let recv = received.clone();
        signal.connect(move |value| {
            recv.fetch_add(*value as usize, Ordering::SeqCst);
        });

        signal.emit(5);
        signal.emit(7);
        assert_eq!(received.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let id = signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(());
        assert_eq!(signal.disconnect(id), Ok(()));
        assert_eq!(signal.disconnect(id), Err(SignalError::InvalidConnection));
        signal.emit(());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocked_emission() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!signal.set_blocked(true));
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(signal.set_blocked(false));
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(tag));
        }

        signal.emit(());
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reentrant_disconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_signal = signal.clone();
        let c = count.clone();
        let id = signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        signal.connect(move |_| {
            // Disconnecting a sibling mid-emission must not deadlock.
            let _ = inner_signal.disconnect(id);
        });

        signal.emit(());
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connection_guard_drops_connection() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(AtomicUsize::new(0));

        {
            let c = count.clone();
            let _guard = signal.connect_guarded(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(signal.connection_count(), 1);
            signal.emit(());
        }

        assert_eq!(signal.connection_count(), 0);
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_disconnect_after_signal_dropped() {
        let signal = Arc::new(Signal::<()>::new());
        let guard = signal.connect_guarded(|_| {});

        drop(signal);
        assert_eq!(guard.disconnect(), Err(SignalError::SignalDropped));
    }
}
