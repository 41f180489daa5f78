//! Error taxonomy for the dispatch path.
//!
//! Errors never cross the HTTP boundary as a typed surface; the handler
//! maps them to status codes and plain-text bodies.

use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong before response headers are committed.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The balancer has no backend in rotation.
    #[error("no healthy backends available")]
    NoHealthyBackends,

    /// The breaker refused dispatch. The request is not retried against
    /// another backend.
    #[error("circuit breaker open for {0}")]
    CircuitOpen(String),

    /// The client body exceeded the configured limit.
    #[error("request body too large: {size} bytes (max: {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The client body read failed mid-stream.
    #[error("failed to buffer request body: {0}")]
    BufferRead(#[source] axum::Error),

    /// Connect/send/recv against the backend failed, or the deadline
    /// elapsed.
    #[error("failed to proxy request to {address}: {reason}")]
    UpstreamTransport { address: String, reason: String },
}

impl ProxyError {
    /// HTTP status surfaced to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}
