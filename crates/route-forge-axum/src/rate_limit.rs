//! Per-client request budget applied in front of every route.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::RateLimitSettings;
use crate::error::{ApiError, ServerError};
use crate::state::ForgeState;

/// Bucket shared by requests that carry no peer address, such as injected
/// ones.
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Tracked clients above which idle buckets are dropped.
const PRUNE_ABOVE: usize = 10_000;

/// Token buckets keyed by client IP.
pub struct RateLimit {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
}

impl std::fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimit")
            .field("clients", &self.limiter.len())
            .finish()
    }
}

impl RateLimit {
    /// Fails when `period / requests` rounds down to zero.
    pub fn new(settings: &RateLimitSettings) -> Result<Self, ServerError> {
        let interval = settings.period / settings.requests.get();
        let quota = Quota::with_period(interval).ok_or_else(|| {
            ServerError::RateLimit(format!(
                "{} requests per {} leaves no time between requests",
                settings.requests,
                humantime::format_duration(settings.period)
            ))
        })?;
        Ok(Self {
            limiter: RateLimiter::keyed(quota.allow_burst(settings.requests)),
            clock: DefaultClock::default(),
        })
    }

    /// Takes one request from `client`'s bucket. `Err` holds how long until
    /// the next request would be admitted.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        if self.limiter.len() > PRUNE_ABOVE {
            self.limiter.retain_recent();
        }
        self.limiter
            .check_key(&client)
            .map_err(|denied| denied.wait_time_from(self.clock.now()))
    }
}

/// Answers 429 once the caller's budget is spent. Without configured limits,
/// requests pass through untouched.
pub async fn rate_limit_middleware(
    State(state): State<ForgeState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limit) = state.rate_limit.clone() else {
        return next.run(request).await;
    };

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(UNKNOWN_CLIENT, |ConnectInfo(addr)| addr.ip());
    match limit.check(client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::debug!(%client, uri = %request.uri(), ?retry_after, "rate limited");
            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}
