//! Client IP extraction behind Cloudflare and Fly.io.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// Best-known client address of the request.
///
/// Checks `CF-Connecting-IP`, the first hop of `X-Forwarded-For`,
/// `X-Real-IP` and `Fly-Client-IP`, in that order, then falls back to the
/// socket peer address. `None` when nothing usable is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = from_headers(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        });

        Ok(Self(ip))
    }
}

fn from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    // Cloudflare's real client IP
    if let Some(ip) = header("cf-connecting-ip").and_then(|s| s.trim().parse().ok()) {
        return Some(ip);
    }

    // First IP in the proxy chain
    if let Some(ip) = header("x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = header("x-real-ip").and_then(|s| s.trim().parse().ok()) {
        return Some(ip);
    }

    // Fly.io edge
    header("fly-client-ip").and_then(|s| s.trim().parse().ok())
}
