//! Session bookkeeping and connection limiting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dexwatch_telemetry::Metrics;
use uuid::Uuid;

/// One connected subscriber.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
}

/// Registry of connected sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session with a fresh id.
    pub fn register(&self) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
        };
        self.sessions.insert(session.id, session.clone());
        Metrics::session_connected();
        session
    }

    /// Remove a session. Returns it if it was registered.
    pub fn remove(&self, id: Uuid) -> Option<Session> {
        let removed = self.sessions.remove(&id).map(|(_, session)| session);
        if removed.is_some() {
            Metrics::session_disconnected();
        }
        removed
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Caps concurrent WebSocket sessions.
pub(crate) struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Claim a slot. The slot is held until the guard drops, so the guard
    /// can travel into the upgraded session task.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub(crate) fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub(crate) fn max(&self) -> usize {
        self.max
    }
}

pub(crate) struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}
