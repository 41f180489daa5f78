//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, dispatch handler)
//!     → buffer.rs (bounded body buffering)
//!     → [load_balancer picks backend, resilience admits the call]
//!     → request.rs (forwarded headers, client identity)
//!     → upstream client → response relayed to the client
//! ```

pub mod buffer;
pub mod error;
pub mod request;
pub mod server;
pub mod stats;

pub use buffer::RequestBuffer;
pub use error::ProxyError;
pub use server::{AppState, ProxyServer};
pub use stats::{ProxyStats, StatsSnapshot};
