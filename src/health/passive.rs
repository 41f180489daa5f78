//! Passive health monitoring (failure detection).
//!
//! # Responsibilities
//! - Observe real proxied-request outcomes
//! - Track consecutive transport failures per backend
//! - Evict a backend when the failure threshold is reached
//!
//! # Design Decisions
//! - Only transport errors count; an HTTP 5xx from a reachable backend is
//!   not a failure here
//! - The monitor only evicts. Recovery is the active checker's job: absence
//!   of failure is not evidence of health

use std::sync::Arc;

use dashmap::DashMap;

use crate::load_balancer::BackendPool;

/// Counts consecutive proxy failures per backend address.
#[derive(Debug)]
pub struct PassiveMonitor {
    pool: Arc<BackendPool>,
    unhealthy_threshold: u32,
    failure_counts: DashMap<String, u32>,
}

impl PassiveMonitor {
    pub fn new(pool: Arc<BackendPool>, unhealthy_threshold: u32) -> Self {
        Self {
            pool,
            unhealthy_threshold,
            failure_counts: DashMap::new(),
        }
    }

    /// A request to `address` completed; its failure streak is over.
    pub fn record_success(&self, address: &str) {
        self.failure_counts.insert(address.to_string(), 0);
    }

    /// A request to `address` failed at the transport level. At the
    /// threshold the backend is taken out of rotation.
    pub fn record_failure(&self, address: &str) {
        let mut entry = self.failure_counts.entry(address.to_string()).or_insert(0);
        *entry += 1;
        let failures = *entry;
        drop(entry);

        if failures >= self.unhealthy_threshold {
            tracing::warn!(
                address = %address,
                failures,
                "backend evicted after consecutive proxy failures"
            );
            self.pool.mark_unhealthy(address);
        }
    }
}
