//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use waypoint::{ProxyConfig, ProxyServer, Shutdown};

/// Start the proxy on the configured listen address and give it a moment
/// to come up. The returned coordinator stops it when triggered.
pub async fn start_proxy(config: ProxyConfig) -> Arc<Shutdown> {
    let listener = TcpListener::bind(&config.server.listen).await.unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = ProxyServer::new(config);

    let coordinator = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = server.run(listener, &coordinator).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// Start a mock backend that answers every request with a fixed 200 body.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, body: &'static str) {
    start_programmable_backend(addr, move || async move { (200, body.to_string()) }).await;
}

/// Start a mock backend whose status and body come from a closure.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = Arc::clone(&f);
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        let (status, body) = f().await;
                        write_response(&mut socket, status, &body).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock backend that echoes the raw request head back as its body,
/// so tests can assert on the headers the proxy actually sent.
#[allow(dead_code)]
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let head = read_request_head(&mut socket).await;
                        let body = String::from_utf8_lossy(&head).to_string();
                        write_response(&mut socket, 200, &body).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Read the request head, then drain any declared body so the peer never
/// sees a reset while still writing.
async fn read_request_head(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = vec![0u8; 8192];
    let mut received = Vec::new();
    let mut head_len = None;

    loop {
        if head_len.is_none() {
            if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                head_len = Some(pos + 4);
            }
        }

        if let Some(head_len) = head_len {
            let head = String::from_utf8_lossy(&received[..head_len]);
            let content_length: usize = head
                .lines()
                .find_map(|l| {
                    let lower = l.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().to_string())
                })
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if received.len() >= head_len + content_length {
                received.truncate(head_len);
                return received;
            }
        }

        match socket.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(_) => break,
        }
    }
    received
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// A reqwest client that talks straight to loopback listeners.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
