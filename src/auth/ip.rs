//! Client IP extraction.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};

/// Extract the client IP address from a request.
///
/// Checks the X-Forwarded-For header first (reverse proxy), then falls back
/// to the socket address from ConnectInfo.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
