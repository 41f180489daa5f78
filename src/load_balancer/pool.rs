//! Backend pool management.
//!
//! # Responsibilities
//! - Own the backend set (order fixed at construction)
//! - Recompute the healthy subset per selection
//! - Route all health mutation by address

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::least_conn::LeastConnections;
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::Selector;

/// Owns the backends and applies the configured selection policy.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    selector: Box<dyn Selector>,
}

impl BackendPool {
    pub fn new(backends: Vec<Arc<Backend>>, selector: Box<dyn Selector>) -> Self {
        Self { backends, selector }
    }

    /// Build the pool from configuration. Validation has already rejected
    /// unknown algorithm names; anything unrecognized here falls back to
    /// round-robin, matching the configured default.
    pub fn from_config(configs: &[BackendConfig], algorithm: &str) -> Self {
        let backends = configs
            .iter()
            .map(|c| Arc::new(Backend::new(c.address.clone(), c.weight)))
            .collect();

        let selector: Box<dyn Selector> = match algorithm {
            "least-connections" => Box::new(LeastConnections::new()),
            _ => Box::new(RoundRobin::new()),
        };

        Self::new(backends, selector)
    }

    /// Select a backend for the next request.
    ///
    /// The healthy subset is filtered fresh on every call so that health
    /// transitions take effect on the very next selection. Returns `None`
    /// when no backend is in rotation.
    pub fn next(&self) -> Option<Arc<Backend>> {
        let healthy: Vec<Arc<Backend>> = self
            .backends
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect();

        self.selector.select(&healthy)
    }

    /// All backends in configured order, healthy or not.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Put the backend with this address back into rotation. Idempotent;
    /// unknown addresses are ignored.
    pub fn mark_healthy(&self, address: &str) {
        if let Some(backend) = self.find(address) {
            backend.set_healthy(true);
        }
    }

    /// Take the backend with this address out of rotation. Idempotent;
    /// unknown addresses are ignored.
    pub fn mark_unhealthy(&self, address: &str) {
        if let Some(backend) = self.find(address) {
            backend.set_healthy(false);
        }
    }

    fn find(&self, address: &str) -> Option<&Arc<Backend>> {
        self.backends.iter().find(|b| b.address == address)
    }
}
