//! Upstream request preparation: client identity and forwarded headers.
//!
//! # Design Decisions
//! - Client IP resolution trusts proxy-chain headers before the peer
//!   address: `X-Real-IP`, then the first `X-Forwarded-For` entry, then the
//!   socket peer (host only)
//! - `X-Forwarded-For` is appended to, never replaced, so the chain
//!   survives multiple proxy hops

use std::net::SocketAddr;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, HOST};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Resolve the originating client IP for an inbound request.
pub fn client_ip(inbound: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(ip) = header_str(inbound, &X_REAL_IP) {
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    if let Some(xff) = header_str(inbound, &X_FORWARDED_FOR) {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    peer.ip().to_string()
}

/// Stamp the proxy headers onto an outbound header map.
///
/// `outbound` already carries the copied client headers; the four
/// `X-Forwarded-*` values overwrite whatever was copied.
pub fn set_forward_headers(
    outbound: &mut HeaderMap,
    inbound: &HeaderMap,
    peer: SocketAddr,
    tls: bool,
) {
    let ip = client_ip(inbound, peer);

    let forwarded_for = match header_str(inbound, &X_FORWARDED_FOR) {
        Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
        _ => ip.clone(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        outbound.insert(X_FORWARDED_FOR, value);
    }

    if let Ok(value) = HeaderValue::from_str(&ip) {
        outbound.insert(X_REAL_IP, value);
    }

    let proto = if tls { "https" } else { "http" };
    outbound.insert(X_FORWARDED_PROTO, HeaderValue::from_static(proto));

    if let Some(host) = inbound.get(HOST) {
        outbound.insert(X_FORWARDED_HOST, host.clone());
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "192.0.2.7:51000".parse().unwrap()
    }

    #[test]
    fn real_ip_header_wins() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_REAL_IP, HeaderValue::from_static("10.1.1.1"));
        inbound.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.2.2.2"));

        assert_eq!(client_ip(&inbound, peer()), "10.1.1.1");
    }

    #[test]
    fn first_forwarded_for_entry_is_second_choice() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("10.2.2.2, 10.3.3.3"),
        );

        assert_eq!(client_ip(&inbound, peer()), "10.2.2.2");
    }

    #[test]
    fn falls_back_to_peer_host() {
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "192.0.2.7");
    }

    #[test]
    fn forwarded_for_appends_to_existing_chain() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.2.2.2"));
        let mut outbound = inbound.clone();

        set_forward_headers(&mut outbound, &inbound, peer(), false);

        // X-Real-IP is absent, so the client IP is the first chain entry.
        assert_eq!(outbound[&X_FORWARDED_FOR], "10.2.2.2, 10.2.2.2");
        assert_eq!(outbound[&X_REAL_IP], "10.2.2.2");
    }

    #[test]
    fn fresh_chain_starts_with_peer() {
        let inbound = HeaderMap::new();
        let mut outbound = HeaderMap::new();

        set_forward_headers(&mut outbound, &inbound, peer(), false);

        assert_eq!(outbound[&X_FORWARDED_FOR], "192.0.2.7");
        assert_eq!(outbound[&X_REAL_IP], "192.0.2.7");
        assert_eq!(outbound[&X_FORWARDED_PROTO], "http");
        assert!(outbound.get(&X_FORWARDED_HOST).is_none());
    }

    #[test]
    fn proto_and_host_reflect_the_inbound_request() {
        let mut inbound = HeaderMap::new();
        inbound.insert(HOST, HeaderValue::from_static("api.example.com"));
        let mut outbound = HeaderMap::new();

        set_forward_headers(&mut outbound, &inbound, peer(), true);

        assert_eq!(outbound[&X_FORWARDED_PROTO], "https");
        assert_eq!(outbound[&X_FORWARDED_HOST], "api.example.com");
    }
}
