//! Round-robin selection.
//!
//! # Algorithm
//! Atomically post-increment a cursor and index the healthy subset modulo
//! its size. Concurrent callers that observe the same subset size therefore
//! receive distinct, contiguous indices.
//!
//! # Design Decisions
//! - Lock-free: a single atomic counter, wrapping on overflow
//! - Equidistribution within ±1 while the healthy set is stable
//! - Ties broken by configured order

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;
use crate::load_balancer::Selector;

#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn select(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if healthy.is_empty() {
            return None;
        }

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(Arc::clone(&healthy[(idx % healthy.len() as u64) as usize]))
    }
}
