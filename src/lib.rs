//! Waypoint: an HTTP/1.1 reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!                 │                  WAYPOINT                      │
//!  Client ───────▶│  http::server ──▶ load_balancer ──▶ resilience │──▶ Backends
//!                 │       │                 ▲               │      │
//!                 │  http::buffer           │               │      │
//!                 │                  health (active+passive)◀──────│
//!                 │                                                │
//!                 │  admin (read-only API)   observability  config │
//!                 └───────────────────────────────────────────────┘
//! ```
//!
//! One request flows: buffer the body, pick a healthy backend, ask its
//! circuit breaker for admission, forward, record the outcome for both the
//! breaker and the passive monitor, stream the response back. The active
//! checker probes all backends in the background and is the only path that
//! returns an evicted backend to rotation.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
