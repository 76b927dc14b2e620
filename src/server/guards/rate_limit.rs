use crate::error::MurshidError;
use crate::ratelimit::RateDecision;
use crate::server::router::MurshidState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::warn;

/// Admission guard for the chat routes: one sliding-window bucket per
/// client IP, shared through `MurshidState`.
#[derive(Debug, Clone, Copy)]
pub struct RateGuard;

impl FromRequestParts<MurshidState> for RateGuard {
    type Rejection = MurshidError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MurshidState,
    ) -> Result<Self, Self::Rejection> {
        let ip = client_ip(parts);

        match state.limiter.check(ip) {
            RateDecision::Allowed => Ok(RateGuard),
            RateDecision::Limited { retry_after } => {
                warn!(client_ip = %ip, "Rate limit exceeded");
                Err(MurshidError::RateLimited {
                    retry_after_secs: retry_after.as_secs().max(1),
                })
            }
        }
    }
}

/// First `x-forwarded-for` hop wins (deployments sit behind a proxy),
/// then the socket peer address. Requests with neither share one bucket.
fn client_ip(parts: &Parts) -> IpAddr {
    let forwarded = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
