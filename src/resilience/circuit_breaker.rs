//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: probe traffic admitted to test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures reach failure_threshold
//! Open → Half-Open: first allow() after the cooldown timeout
//! Half-Open → Closed: consecutive successes reach success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - Consecutive-failure counting: any success in Closed zeroes the count,
//!   so transient blips do not accumulate
//! - The Open → Half-Open transition is lazy, made on `allow()` rather than
//!   a timer; a backend with no traffic stays Open
//! - All probe traffic is admitted in Half-Open; success_threshold closes
//!   the loop

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Closed => "CLOSED",
            State::Open => "OPEN",
            State::HalfOpen => "HALF-OPEN",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct Inner {
    state: State,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
}

/// Per-backend circuit breaker.
#[derive(Debug)]
pub struct Breaker {
    failure_threshold: u32,
    success_threshold: u32,
    timeout: Duration,
    inner: RwLock<Inner>,
}

impl Breaker {
    pub fn new(failure_threshold: u32, success_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            timeout,
            inner: RwLock::new(Inner {
                state: State::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
            }),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            config.success_threshold,
            config.timeout(),
        )
    }

    /// Whether a request may be dispatched right now.
    ///
    /// In Open, the first call at or past the cooldown flips the circuit to
    /// Half-Open and admits the caller as a probe.
    pub fn allow(&self) -> bool {
        let mut inner = self
            .inner
            .write()
            .expect("circuit breaker state lock poisoned");

        match inner.state {
            State::Closed => true,
            State::Open => {
                let cooled_down = inner
                    .last_failure
                    .map(|at| at.elapsed() >= self.timeout)
                    .unwrap_or(true);

                if cooled_down {
                    inner.state = State::HalfOpen;
                    inner.successes = 0;
                    tracing::info!("circuit half-open, admitting probe traffic");
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => true,
        }
    }

    /// Record a successful upstream call.
    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .write()
            .expect("circuit breaker state lock poisoned");

        match inner.state {
            State::Closed => inner.failures = 0,
            State::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.success_threshold {
                    inner.state = State::Closed;
                    inner.failures = 0;
                    tracing::info!(
                        successes = inner.successes,
                        "circuit closed, backend recovered"
                    );
                }
            }
            // A success landing while Open (its allow predated the trip)
            // is dealt with by the Half-Open rules on a later call.
            State::Open => {}
        }
    }

    /// Record a failed upstream call.
    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .write()
            .expect("circuit breaker state lock poisoned");

        match inner.state {
            State::Closed => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.last_failure = Some(Instant::now());
                    tracing::warn!(failures = inner.failures, "circuit opened");
                }
            }
            State::HalfOpen => {
                inner.state = State::Open;
                inner.last_failure = Some(Instant::now());
                inner.successes = 0;
                tracing::warn!("circuit reopened, half-open probe failed");
            }
            State::Open => {}
        }
    }

    pub fn state(&self) -> State {
        self.inner
            .read()
            .expect("circuit breaker state lock poisoned")
            .state
    }

    /// Force the breaker back to a freshly constructed state. Administrative
    /// intervention only; never called on the dispatch path.
    pub fn reset(&self) {
        let mut inner = self
            .inner
            .write()
            .expect("circuit breaker state lock poisoned");
        inner.state = State::Closed;
        inner.failures = 0;
        inner.successes = 0;
        inner.last_failure = None;
    }
}
