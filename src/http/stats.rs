//! Global request counters.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Counters shared by the dispatch path and the admin API.
///
/// `active_requests` mirrors the number of requests currently inside the
/// handler; the RAII guard guarantees the decrement on every exit path.
#[derive(Debug, Default)]
pub struct ProxyStats {
    total_requests: AtomicU64,
    active_requests: AtomicI64,
    failed_requests: AtomicU64,
}

/// Point-in-time view, serialized by the admin `/stats` endpoint.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub active_requests: i64,
    pub failed_requests: u64,
}

impl ProxyStats {
    /// Count a request entering the handler. Dropping the guard counts it
    /// as exited.
    pub fn track(self: &Arc<Self>) -> RequestGuard {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        RequestGuard {
            stats: Arc::clone(self),
        }
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            active_requests: self.active_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

/// RAII guard for one in-flight request.
#[derive(Debug)]
pub struct RequestGuard {
    stats: Arc<ProxyStats>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.stats.active_requests.fetch_sub(1, Ordering::Relaxed);
    }
}
