//! Proxy server setup and the request dispatch path.
//!
//! # Responsibilities
//! - Wire the balancer, breaker pool, passive monitor, and request buffer
//!   into one shared state
//! - Serve the proxy handler on the main listener
//! - Spawn the active health checker and the admin API
//! - Forward requests upstream and record outcomes
//!
//! # Design Decisions
//! - The body is buffered before a backend is selected, so transient
//!   backend failure is detected before any bytes are forwarded
//! - Breaker and passive-monitor state change only on transport errors; an
//!   HTTP error status from a reachable backend is relayed untouched
//! - No retry against another backend: a failed dispatch surfaces to the
//!   client and only the next request benefits from the updated health view

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::CONTENT_LENGTH, request::Parts, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::admin;
use crate::config::ProxyConfig;
use crate::health::{HealthChecker, PassiveMonitor};
use crate::http::buffer::RequestBuffer;
use crate::http::error::ProxyError;
use crate::http::request::set_forward_headers;
use crate::http::stats::ProxyStats;
use crate::lifecycle::Shutdown;
use crate::load_balancer::BackendPool;
use crate::observability::metrics;
use crate::resilience::BreakerPool;

/// Total deadline for one upstream exchange.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle upstream connections kept per backend host.
const UPSTREAM_POOL_IDLE_PER_HOST: usize = 100;

/// How long an idle upstream connection may live.
const UPSTREAM_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<BackendPool>,
    pub breakers: Arc<BreakerPool>,
    pub passive: Arc<PassiveMonitor>,
    pub buffer: RequestBuffer,
    pub stats: Arc<ProxyStats>,
    pub client: Client<HttpConnector, Body>,
    pub breaker_enabled: bool,
}

/// The reverse proxy server.
pub struct ProxyServer {
    config: ProxyConfig,
    state: AppState,
}

impl ProxyServer {
    /// Wire all subsystems from validated configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let pool = Arc::new(BackendPool::from_config(
            &config.backends,
            &config.load_balancing.algorithm,
        ));
        let breakers = Arc::new(BreakerPool::new(config.circuit_breaker.clone()));
        let passive = Arc::new(PassiveMonitor::new(
            Arc::clone(&pool),
            config.health_check.unhealthy_threshold,
        ));

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(UPSTREAM_POOL_IDLE_PER_HOST)
            .pool_idle_timeout(UPSTREAM_POOL_IDLE_TIMEOUT)
            .build(HttpConnector::new());

        let state = AppState {
            pool,
            breakers,
            passive,
            buffer: RequestBuffer::new(config.buffer.max_request_body),
            stats: Arc::new(ProxyStats::default()),
            client,
            breaker_enabled: config.circuit_breaker.enabled,
        };

        Self { config, state }
    }

    /// Shared state, exposed for the admin surface and tests.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the proxy on `listener` until the shutdown signal fires.
    ///
    /// Spawns the health checker (when enabled) and the admin API with
    /// their own shutdown subscriptions.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            algorithm = %self.config.load_balancing.algorithm,
            backends = self.config.backends.len(),
            "proxy listening"
        );

        if self.config.health_check.enabled {
            let checker = HealthChecker::new(
                Arc::clone(&self.state.pool),
                self.config.health_check.clone(),
            );
            let rx = shutdown.subscribe();
            tokio::spawn(checker.run(rx));
            tracing::info!(
                interval_secs = self.config.health_check.interval_secs,
                path = %self.config.health_check.path,
                "health checker started"
            );
        }

        if !self.config.server.admin_listen.is_empty() {
            let admin_listener = TcpListener::bind(&self.config.server.admin_listen).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "admin api listening");

            let router = admin::router(self.state.clone());
            let mut rx = shutdown.subscribe();
            tokio::spawn(async move {
                let serve = axum::serve(admin_listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await;
                if let Err(error) = serve {
                    tracing::error!(error = %error, "admin server error");
                }
            });
        }

        let app = Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(self.state)
            .layer(TraceLayer::new_for_http());

        let mut rx = shutdown.subscribe();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = rx.recv().await;
        })
        .await?;

        tracing::info!("proxy server stopped");
        Ok(())
    }
}

/// Dispatch one client request to a backend.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let _in_flight = state.stats.track();
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let (parts, body) = request.into_parts();

    // A declared empty body skips buffering; anything else is read up
    // front, never trusting the declared length.
    let declares_empty = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        == Some("0");

    let buffered = if declares_empty {
        None
    } else {
        match state.buffer.buffer(body).await {
            Ok(buffered) => buffered,
            Err(error @ ProxyError::BodyTooLarge { .. }) => {
                tracing::warn!(
                    request_id = %request_id,
                    error = %error,
                    "rejecting oversized request body"
                );
                metrics::record_rejected_request("body_too_large");
                return (error.status(), error.to_string()).into_response();
            }
            Err(error) => {
                state.stats.record_failure();
                tracing::warn!(
                    request_id = %request_id,
                    error = %error,
                    "request body read failed"
                );
                metrics::record_rejected_request("body_read_error");
                return (error.status(), error.to_string()).into_response();
            }
        }
    };

    match forward(&state, &parts, buffered, peer, started).await {
        Ok(response) => response,
        Err(error) => {
            state.stats.record_failure();
            tracing::warn!(request_id = %request_id, error = %error, "proxy error");
            (error.status(), error.to_string()).into_response()
        }
    }
}

/// Select a backend, consult its breaker, and relay the exchange.
async fn forward(
    state: &AppState,
    parts: &Parts,
    buffered: Option<Bytes>,
    peer: SocketAddr,
    started: Instant,
) -> Result<Response, ProxyError> {
    let backend = state.pool.next().ok_or(ProxyError::NoHealthyBackends)?;

    let breaker = state
        .breaker_enabled
        .then(|| state.breakers.get(&backend.address));
    if let Some(breaker) = &breaker {
        if !breaker.allow() {
            return Err(ProxyError::CircuitOpen(backend.address.clone()));
        }
    }

    let _connection = backend.track_connection();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("http://{}{}", backend.address, path_and_query);

    let upstream_body = match &buffered {
        Some(bytes) => Body::from(bytes.clone()),
        None => Body::empty(),
    };
    let mut upstream_request = Request::builder()
        .method(parts.method.clone())
        .uri(target)
        .body(upstream_body)
        .map_err(|error| ProxyError::UpstreamTransport {
            address: backend.address.clone(),
            reason: format!("failed to build upstream request: {error}"),
        })?;

    let outbound = upstream_request.headers_mut();
    for (name, value) in parts.headers.iter() {
        // Host is derived from the target authority by the client.
        if name == axum::http::header::HOST {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
    set_forward_headers(outbound, &parts.headers, peer, false);

    let response = match tokio::time::timeout(
        UPSTREAM_TIMEOUT,
        state.client.request(upstream_request),
    )
    .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            if let Some(breaker) = &breaker {
                breaker.record_failure();
            }
            state.passive.record_failure(&backend.address);
            return Err(ProxyError::UpstreamTransport {
                address: backend.address.clone(),
                reason: error.to_string(),
            });
        }
        Err(_) => {
            if let Some(breaker) = &breaker {
                breaker.record_failure();
            }
            state.passive.record_failure(&backend.address);
            return Err(ProxyError::UpstreamTransport {
                address: backend.address.clone(),
                reason: format!("request timed out after {}s", UPSTREAM_TIMEOUT.as_secs()),
            });
        }
    };

    // The backend answered: a success for breaker and monitor, whatever the
    // status code says.
    if let Some(breaker) = &breaker {
        breaker.record_success();
    }
    state.passive.record_success(&backend.address);

    let (response_parts, response_body) = response.into_parts();
    metrics::record_request(
        parts.method.as_str(),
        response_parts.status.as_u16(),
        &backend.address,
        started.elapsed(),
    );

    // A stream error past this point is logged only; the upstream call
    // itself succeeded and headers are already committed.
    let address = backend.address.clone();
    let relayed = Body::new(response_body.map_err(move |error| {
        tracing::warn!(
            address = %address,
            error = %error,
            "error streaming upstream response body"
        );
        axum::Error::new(error)
    }));

    Ok(Response::from_parts(response_parts, relayed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn test_config(addrs: &[&str]) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.server.admin_listen = String::new();
        for a in addrs {
            config.backends.push(BackendConfig {
                address: a.to_string(),
                weight: 1,
            });
        }
        config
    }

    #[tokio::test]
    async fn forward_with_no_healthy_backends_fails_fast() {
        let server = ProxyServer::new(test_config(&["127.0.0.1:1"]));
        let state = server.state().clone();
        state.pool.mark_unhealthy("127.0.0.1:1");

        let (parts, _) = Request::builder()
            .uri("/x")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        let err = forward(&state, &parts, None, peer, Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NoHealthyBackends));
    }

    #[tokio::test]
    async fn transport_failure_records_breaker_and_monitor() {
        // Port 1 refuses connections, so every dispatch is a transport error.
        let mut config = test_config(&["127.0.0.1:1"]);
        config.circuit_breaker.failure_threshold = 2;
        config.health_check.unhealthy_threshold = 3;
        let server = ProxyServer::new(config);
        let state = server.state().clone();

        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        for _ in 0..2 {
            let (parts, _) = Request::builder()
                .uri("/x")
                .body(Body::empty())
                .unwrap()
                .into_parts();
            let err = forward(&state, &parts, None, peer, Instant::now())
                .await
                .unwrap_err();
            assert!(matches!(err, ProxyError::UpstreamTransport { .. }));
        }

        assert_eq!(
            state.breakers.get("127.0.0.1:1").state(),
            crate::resilience::State::Open
        );
        // Third dispatch is refused by the breaker, not the transport.
        let (parts, _) = Request::builder()
            .uri("/x")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let err = forward(&state, &parts, None, peer, Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::CircuitOpen(_)));
    }

    #[tokio::test]
    async fn connection_counters_return_to_zero_after_failures() {
        let server = ProxyServer::new(test_config(&["127.0.0.1:1"]));
        let state = server.state().clone();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        let (parts, _) = Request::builder()
            .uri("/x")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let _ = forward(&state, &parts, None, peer, Instant::now()).await;

        assert_eq!(state.pool.backends()[0].connections(), 0);
    }

    #[tokio::test]
    async fn breaker_disabled_skips_the_pool_entirely() {
        let mut config = test_config(&["127.0.0.1:1"]);
        config.circuit_breaker.enabled = false;
        config.circuit_breaker.failure_threshold = 1;
        let server = ProxyServer::new(config);
        let state = server.state().clone();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        for _ in 0..3 {
            let (parts, _) = Request::builder()
                .uri("/x")
                .body(Body::empty())
                .unwrap()
                .into_parts();
            let err = forward(&state, &parts, None, peer, Instant::now())
                .await
                .unwrap_err();
            // Always a transport error, never a circuit rejection.
            assert!(matches!(err, ProxyError::UpstreamTransport { .. }));
        }

        assert!(state.breakers.all_breakers().is_empty());
    }
}
