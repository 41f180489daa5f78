//! Least Connections selection.

use std::sync::Arc;

use crate::load_balancer::backend::Backend;
use crate::load_balancer::Selector;

/// Selects the backend with the minimum number of in-flight connections.
///
/// The read of the counters is not atomic with the dispatch that follows;
/// the slight race converges over many requests.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for LeastConnections {
    fn select(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // min_by_key keeps the first minimum, so ties go to the earliest
        // backend in configured order.
        healthy.iter().min_by_key(|b| b.connections()).cloned()
    }
}
