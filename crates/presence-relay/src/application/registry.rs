//! ConnectionRegistry: the single table of open connections.
//!
//! Every open WebSocket has exactly one entry here, keyed by its
//! [`ConnectionHandle`].  The entry holds the mutable [`ClientRecord`] and the
//! connection's outbound sink.  Presence is always derived from this table;
//! nothing else in the relay keeps a copy of who is streaming.
//!
//! # Concurrency
//!
//! One `tokio::sync::Mutex` guards the whole table.  Every operation takes
//! the lock once, does O(connections) work at most, and releases it before
//! any frame is sent.  Snapshots are copies, so callers iterate them without
//! holding the lock and concurrent inserts or removals cannot invalidate them.
//!
//! # Ordering
//!
//! Handles come from a monotonically increasing counter and the table is a
//! `BTreeMap`, so iteration order is connection-open order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use presence_core::{ClientRecord, ConnectionHandle, PresenceSnapshot, StreamerEntry};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::application::outbound::SharedSink;

/// Error type for registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// `insert` was called with a handle that is already present.
    #[error("connection handle already registered: {0}")]
    DuplicateHandle(ConnectionHandle),
}

/// One registry entry: the client's state plus the way to reach it.
#[derive(Clone)]
pub struct Connection {
    pub record: ClientRecord,
    pub sink: SharedSink,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Everything a broadcast needs, taken under one lock acquisition.
pub struct BroadcastSnapshot {
    pub presence: PresenceSnapshot,
    pub recipients: Vec<(ConnectionHandle, SharedSink)>,
}

/// Concurrency-safe table of open connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<BTreeMap<ConnectionHandle, Connection>>,
    next_handle: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh handle.  Handles are never reused.
    pub fn allocate_handle(&self) -> ConnectionHandle {
        ConnectionHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Adds a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateHandle`] if `handle` is already
    /// present; the existing entry is left untouched.
    pub async fn insert(
        &self,
        handle: ConnectionHandle,
        record: ClientRecord,
        sink: SharedSink,
    ) -> Result<(), RegistryError> {
        let mut conns = self.connections.lock().await;
        if conns.contains_key(&handle) {
            return Err(RegistryError::DuplicateHandle(handle));
        }
        conns.insert(handle, Connection { record, sink });
        Ok(())
    }

    /// Returns a copy of the record for `handle`, if it is still registered.
    pub async fn get(&self, handle: ConnectionHandle) -> Option<ClientRecord> {
        self.connections
            .lock()
            .await
            .get(&handle)
            .map(|c| c.record.clone())
    }

    /// Applies `f` to the record in place.
    ///
    /// Returns `None` without calling `f` if the connection has already been
    /// removed; removal races are expected and are not an error.
    pub async fn mutate<F, R>(&self, handle: ConnectionHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut ClientRecord) -> R,
    {
        self.connections
            .lock()
            .await
            .get_mut(&handle)
            .map(|c| f(&mut c.record))
    }

    /// Removes and returns the entry for `handle`.
    ///
    /// Idempotent: a second call for the same handle returns `None`.
    pub async fn remove(&self, handle: ConnectionHandle) -> Option<Connection> {
        self.connections.lock().await.remove(&handle)
    }

    /// Removes the entry only if it has been idle for longer than `timeout`
    /// as of `now`.  The check and the removal happen under one lock, so a
    /// connection that became active in the meantime is kept.
    pub async fn remove_if_stale(
        &self,
        handle: ConnectionHandle,
        now: Instant,
        timeout: Duration,
    ) -> Option<Connection> {
        let mut conns = self.connections.lock().await;
        let stale = conns
            .get(&handle)
            .is_some_and(|c| c.record.is_stale(now, timeout));
        if stale {
            conns.remove(&handle)
        } else {
            None
        }
    }

    /// Point-in-time list of streamers in connection-open order.
    pub async fn snapshot_streamers(&self) -> Vec<StreamerEntry> {
        self.presence().await.users
    }

    /// The current presence view; recomputed on every call.
    pub async fn presence(&self) -> PresenceSnapshot {
        let conns = self.connections.lock().await;
        PresenceSnapshot::from_records(conns.values().map(|c| &c.record))
    }

    /// Point-in-time list of all handles in connection-open order.
    pub async fn all_handles(&self) -> Vec<ConnectionHandle> {
        self.connections.lock().await.keys().copied().collect()
    }

    /// Presence view and recipient list taken from the same instant of the
    /// table, so a broadcast is internally consistent.
    pub async fn broadcast_snapshot(&self) -> BroadcastSnapshot {
        let conns = self.connections.lock().await;
        BroadcastSnapshot {
            presence: PresenceSnapshot::from_records(conns.values().map(|c| &c.record)),
            recipients: conns.iter().map(|(h, c)| (*h, c.sink.clone())).collect(),
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
