//! Client IP extraction
//!
//! Forwarding headers are only honoured when the server is configured to sit
//! behind trusted proxies; otherwise the peer address is authoritative.

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use std::net::{IpAddr, SocketAddr};

pub const UNKNOWN_IP: &str = "unknown";

/// Extract the client IP for rate limiting and audit logs.
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `socket_addr` - Peer address of the TCP connection, when known
/// * `trusted_proxy_count` - Number of proxies in front of the server that
///   append to `X-Forwarded-For`
///
/// Each trusted proxy appends the address it received the request from, so
/// the client is the `trusted_proxy_count`-th entry from the right. Entries to
/// the left of it are client-controlled and ignored.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| extract_from_forwarded_for(v, trusted_proxy_count))
        {
            return ip;
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| is_valid_ip(s))
        {
            return ip.to_string();
        }
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Same as [`extract_client_ip`], reading the peer address from
/// `ConnectInfo` in the request extensions.
pub fn client_ip_from_parts(
    headers: &HeaderMap,
    extensions: &Extensions,
    trusted_proxy_count: usize,
) -> String {
    let socket_addr = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    extract_client_ip(headers, socket_addr.as_ref(), trusted_proxy_count)
}

fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let client_ip_pos = ips.len().checked_sub(trusted_proxy_count)?;
    let client_ip = ips.get(client_ip_pos)?;

    is_valid_ip(client_ip).then(|| client_ip.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}
