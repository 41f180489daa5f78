//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track the health flag toggled by the health subsystems
//! - Track in-flight connections (for Least Connections LB)

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A single backend server.
///
/// The address is the backend's identity and never changes after
/// construction. Health and the in-flight counter are mutated concurrently
/// by the dispatch path and the health subsystems.
#[derive(Debug)]
pub struct Backend {
    /// host:port of the backend.
    pub address: String,
    /// Weight, stored for reporting. Current policies ignore it.
    pub weight: u32,
    /// Whether the backend is in rotation.
    healthy: AtomicBool,
    /// Number of in-flight proxied requests targeting this backend.
    active_connections: AtomicUsize,
}

impl Backend {
    /// Create a new backend. Non-positive weights are coerced to 1.
    pub fn new(address: impl Into<String>, weight: i32) -> Self {
        Self {
            address: address.into(),
            weight: if weight <= 0 { 1 } else { weight as u32 },
            healthy: AtomicBool::new(true),
            active_connections: AtomicUsize::new(0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    /// Current number of in-flight connections.
    pub fn connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Acquire a connection slot, incrementing the in-flight counter.
    ///
    /// The returned guard decrements the counter when dropped, so the
    /// decrement runs exactly once on every exit path.
    pub fn track_connection(self: &Arc<Self>) -> ConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            backend: Arc::clone(self),
        }
    }

    fn release_connection(&self) {
        // Saturating: the counter never goes below zero even if a guard is
        // dropped against a freshly reset backend.
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(1))
            });
    }
}

/// RAII guard for one in-flight connection to a backend.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl Deref for ConnectionGuard {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.release_connection();
    }
}
