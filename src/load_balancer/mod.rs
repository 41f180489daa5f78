//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → pool.rs (filter healthy backends, configured order)
//!     → Apply selection policy:
//!         - round_robin.rs (rotate through healthy backends)
//!         - least_conn.rs (pick backend with fewest in-flight connections)
//!     → backend.rs (RAII guard tracks the in-flight connection)
//! ```
//!
//! # Design Decisions
//! - The healthy subset is recomputed on every selection, never cached, so
//!   health transitions take effect on the very next request
//! - Selectors are stateless apart from round-robin's atomic cursor
//! - Health mutation goes through the pool by address

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use backend::Backend;

/// A selection policy over the current healthy subset.
///
/// `healthy` preserves the configured backend order; implementations must
/// return `None` only when it is empty.
pub trait Selector: Send + Sync + std::fmt::Debug {
    fn select(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

pub use pool::BackendPool;
