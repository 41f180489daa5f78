//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's health endpoint
//! - Flip backend health through hysteresis thresholds
//! - Stop promptly on shutdown
//!
//! # Design Decisions
//! - Dedicated HTTP client with a per-probe timeout, separate from the
//!   proxy's upstream client
//! - Probes within a sweep run concurrently and are joined before the next
//!   tick
//! - A 2xx/3xx response is a success; transport errors, timeouts, and all
//!   other statuses are failures
//! - Hysteresis: consecutive counts in each direction, reset by the
//!   opposite outcome, so a flapping backend does not thrash rotation

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::config::HealthCheckConfig;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::BackendPool;
use crate::observability::metrics;

/// Periodic prober that drives backend health transitions.
#[derive(Debug)]
pub struct HealthChecker {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: reqwest::Client,
    success_counts: DashMap<String, u32>,
    failure_counts: DashMap<String, u32>,
}

impl HealthChecker {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("health check client construction cannot fail");

        Self {
            pool,
            config,
            client,
            success_counts: DashMap::new(),
            failure_counts: DashMap::new(),
        }
    }

    /// Probe loop. The first tick fires immediately, so backends are swept
    /// at startup instead of after a full interval.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep().await,
                _ = shutdown.recv() => {
                    tracing::info!("health checker stopping");
                    return;
                }
            }
        }
    }

    /// Probe every backend concurrently and join before returning.
    pub async fn sweep(&self) {
        let probes = self
            .pool
            .backends()
            .iter()
            .map(|backend| self.probe(Arc::clone(backend)));

        join_all(probes).await;
    }

    async fn probe(&self, backend: Arc<Backend>) {
        let url = format!("http://{}{}", backend.address, self.config.path);

        let success = match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                (200..400).contains(&status)
            }
            Err(_) => false,
        };

        self.observe(&backend, success);
    }

    /// Apply one probe outcome to the hysteresis counters, flipping backend
    /// health when a threshold is crossed.
    fn observe(&self, backend: &Arc<Backend>, success: bool) {
        let address = backend.address.as_str();

        if success {
            self.failure_counts.insert(address.to_string(), 0);
            let mut entry = self.success_counts.entry(address.to_string()).or_insert(0);
            *entry += 1;
            let successes = *entry;
            drop(entry);

            if successes >= self.config.healthy_threshold && !backend.is_healthy() {
                tracing::info!(
                    address = %address,
                    successes,
                    "backend restored to rotation"
                );
                self.pool.mark_healthy(address);
                metrics::record_backend_health(address, true);
            }
        } else {
            self.success_counts.insert(address.to_string(), 0);
            let mut entry = self.failure_counts.entry(address.to_string()).or_insert(0);
            *entry += 1;
            let failures = *entry;
            drop(entry);

            if failures >= self.config.unhealthy_threshold && backend.is_healthy() {
                tracing::warn!(
                    address = %address,
                    failures,
                    "backend removed from rotation after failed probes"
                );
                self.pool.mark_unhealthy(address);
                metrics::record_backend_health(address, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn checker(addrs: &[&str]) -> (HealthChecker, Arc<BackendPool>) {
        let configs: Vec<BackendConfig> = addrs
            .iter()
            .map(|a| BackendConfig {
                address: a.to_string(),
                weight: 1,
            })
            .collect();
        let pool = Arc::new(BackendPool::from_config(&configs, "round-robin"));
        let config = HealthCheckConfig {
            unhealthy_threshold: 3,
            healthy_threshold: 2,
            ..HealthCheckConfig::default()
        };
        (HealthChecker::new(pool.clone(), config), pool)
    }

    #[tokio::test]
    async fn failures_below_threshold_keep_backend_in_rotation() {
        let (checker, pool) = checker(&["s1:80"]);
        let backend = pool.backends()[0].clone();

        checker.observe(&backend, false);
        checker.observe(&backend, false);
        assert!(backend.is_healthy());
    }

    #[tokio::test]
    async fn threshold_failures_evict_backend() {
        let (checker, pool) = checker(&["s1:80"]);
        let backend = pool.backends()[0].clone();

        for _ in 0..3 {
            checker.observe(&backend, false);
        }
        assert!(!backend.is_healthy());
    }

    #[tokio::test]
    async fn success_resets_failure_streak() {
        let (checker, pool) = checker(&["s1:80"]);
        let backend = pool.backends()[0].clone();

        checker.observe(&backend, false);
        checker.observe(&backend, false);
        checker.observe(&backend, true);
        checker.observe(&backend, false);
        checker.observe(&backend, false);
        assert!(backend.is_healthy());
    }

    #[tokio::test]
    async fn recovery_requires_healthy_threshold_successes() {
        let (checker, pool) = checker(&["s1:80"]);
        let backend = pool.backends()[0].clone();

        for _ in 0..3 {
            checker.observe(&backend, false);
        }
        assert!(!backend.is_healthy());

        checker.observe(&backend, true);
        assert!(!backend.is_healthy());
        checker.observe(&backend, true);
        assert!(backend.is_healthy());
    }

    #[tokio::test]
    async fn failure_resets_success_streak() {
        let (checker, pool) = checker(&["s1:80"]);
        let backend = pool.backends()[0].clone();

        for _ in 0..3 {
            checker.observe(&backend, false);
        }

        checker.observe(&backend, true);
        checker.observe(&backend, false);
        checker.observe(&backend, true);
        assert!(!backend.is_healthy());
        checker.observe(&backend, true);
        assert!(backend.is_healthy());
    }

    #[tokio::test]
    async fn sweep_marks_unreachable_backend_unhealthy() {
        // Nothing listens on these ports; probes fail at the transport.
        let (checker, pool) = checker(&["127.0.0.1:1", "127.0.0.1:2"]);

        for _ in 0..3 {
            checker.sweep().await;
        }

        assert!(pool.backends().iter().all(|b| !b.is_healthy()));
        assert!(pool.next().is_none());
    }
}
