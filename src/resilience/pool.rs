//! Per-backend circuit breaker pool.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::CircuitBreakerConfig;
use crate::resilience::circuit_breaker::{Breaker, State};

/// Lazily-populated mapping from backend address to its breaker.
///
/// Every breaker shares the pool's threshold configuration. Entries are
/// created on first access and never removed.
#[derive(Debug)]
pub struct BreakerPool {
    breakers: RwLock<HashMap<String, Arc<Breaker>>>,
    config: CircuitBreakerConfig,
}

impl BreakerPool {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The breaker for `address`, created on first access.
    pub fn get(&self, address: &str) -> Arc<Breaker> {
        if let Some(breaker) = self
            .breakers
            .read()
            .expect("breaker pool map lock poisoned")
            .get(address)
        {
            return Arc::clone(breaker);
        }

        let mut breakers = self
            .breakers
            .write()
            .expect("breaker pool map lock poisoned");
        // Re-check: another caller may have created it between the locks.
        if let Some(breaker) = breakers.get(address) {
            return Arc::clone(breaker);
        }

        let breaker = Arc::new(Breaker::from_config(&self.config));
        breakers.insert(address.to_string(), Arc::clone(&breaker));
        breaker
    }

    /// Snapshot of every breaker's state, keyed by address.
    pub fn all_breakers(&self) -> HashMap<String, State> {
        self.breakers
            .read()
            .expect("breaker pool map lock poisoned")
            .iter()
            .map(|(addr, breaker)| (addr.clone(), breaker.state()))
            .collect()
    }
}
