//! Resilience subsystem: circuit breaking for failing backends.
//!
//! # Data Flow
//! ```text
//! Dispatch path
//!     → pool.rs (breaker for the selected backend, lazily created)
//!     → circuit_breaker.rs allow() gates the upstream call
//!     → outcome recorded back (transport errors only, never HTTP status)
//! ```

pub mod circuit_breaker;
pub mod pool;

pub use circuit_breaker::{Breaker, State};
pub use pool::BreakerPool;
