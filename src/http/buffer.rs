//! Bounded request-body buffering.
//!
//! # Responsibilities
//! - Read the client body fully into memory before a backend is selected,
//!   so the upstream call is independent of the client socket
//! - Enforce the configured size limit without trusting Content-Length
//!
//! # Design Decisions
//! - The limit check happens as bytes arrive: the buffer accepts a body of
//!   exactly `max_size` bytes and fails the moment one more byte shows up,
//!   which distinguishes at-the-limit from over-the-limit regardless of
//!   what the client declared

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::http::error::ProxyError;

/// Reads and size-limits request bodies into memory.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuffer {
    max_size: usize,
}

impl RequestBuffer {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Buffer the whole body. `Ok(None)` means there was nothing to buffer;
    /// the returned `Bytes` is cheaply cloneable for re-reading.
    pub async fn buffer(&self, body: Body) -> Result<Option<Bytes>, ProxyError> {
        let mut buf = BytesMut::new();
        let mut stream = body.into_data_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ProxyError::BufferRead)?;
            buf.extend_from_slice(&chunk);

            if buf.len() > self.max_size {
                return Err(ProxyError::BodyTooLarge {
                    size: buf.len(),
                    max: self.max_size,
                });
            }
        }

        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }
}
