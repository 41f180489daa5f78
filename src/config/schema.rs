//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a minimal config file is enough to start.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener addresses.
    pub server: ServerConfig,

    /// Backend server definitions.
    pub backends: Vec<BackendConfig>,

    /// Load balancing strategy.
    pub load_balancing: LoadBalancingConfig,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Request body buffering.
    pub buffer: BufferConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Proxy bind address (e.g., "0.0.0.0:8080").
    pub listen: String,

    /// Admin API bind address. Empty string disables the admin API.
    pub admin_listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            admin_listen: "127.0.0.1:8081".to_string(),
        }
    }
}

/// A single backend server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend address as host:port (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Weight, stored and reported. Values <= 0 are treated as 1.
    #[serde(default = "default_weight")]
    pub weight: i32,
}

fn default_weight() -> i32 {
    1
}

/// Load balancing strategy selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancingConfig {
    /// "round-robin" or "least-connections".
    pub algorithm: String,
}

impl Default for LoadBalancingConfig {
    fn default() -> Self {
        Self {
            algorithm: "round-robin".to_string(),
        }
    }
}

/// Active health check configuration.
///
/// `unhealthy_threshold` is also the passive monitor's eviction threshold:
/// both signals share the same consecutive-failure count on purpose.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the active prober. Passive monitoring always runs.
    pub enabled: bool,

    /// Seconds between probe sweeps.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe on each backend.
    pub path: String,

    /// Consecutive probe failures before a backend is marked unhealthy.
    pub unhealthy_threshold: u32,

    /// Consecutive probe successes before a backend is marked healthy again.
    pub healthy_threshold: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 2,
            path: "/health".to_string(),
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// When false, the dispatch path skips the breaker entirely.
    pub enabled: bool,

    /// Consecutive transport failures before the circuit opens.
    pub failure_threshold: u32,

    /// Consecutive successes in half-open before the circuit closes.
    pub success_threshold: u32,

    /// Seconds the circuit stays open before admitting a probe.
    pub timeout_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            success_threshold: 3,
            timeout_secs: 30,
        }
    }
}

/// Request buffering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum buffered request body size in bytes.
    pub max_request_body: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_request_body: 10 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
