use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use std::{
    collections::HashSet,
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

/// Rate limiter keyed by client IP address.
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// Allow `attempts` requests per `window_seconds` per IP, replenished evenly.
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let attempts = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
    let period_ms = (window_seconds.max(1) * 1000) / u64::from(attempts.get());
    let period = Duration::from_millis(period_ms.max(1));
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(attempts))
        .allow_burst(attempts);

    Arc::new(RateLimiter::dashmap(quota))
}

/// A keyed limiter plus the proxies whose `x-forwarded-for` is believed.
///
/// `x-forwarded-for` is ignored unless the socket peer is a trusted proxy,
/// so a direct client cannot pick its own rate-limit key.
#[derive(Clone)]
pub struct IpRateLimit {
    limiter: IpRateLimiter,
    trusted_proxies: Arc<HashSet<IpAddr>>,
}

impl IpRateLimit {
    pub fn new(limiter: IpRateLimiter, trusted_proxies: &[IpAddr]) -> Self {
        Self {
            limiter,
            trusted_proxies: Arc::new(trusted_proxies.iter().copied().collect()),
        }
    }

    pub fn limiter(&self) -> &IpRateLimiter {
        &self.limiter
    }

    /// Key for `request`: the socket peer, or, when the peer is a trusted
    /// proxy, the nearest `x-forwarded-for` hop that is not itself trusted.
    pub fn client_ip(&self, request: &Request) -> Option<IpAddr> {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())?;

        if !self.trusted_proxies.contains(&peer) {
            return Some(peer);
        }

        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|chain| {
                chain
                    .rsplit(',')
                    .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                    .find(|hop| !self.trusted_proxies.contains(hop))
            });

        Some(forwarded.unwrap_or(peer))
    }
}

/// Drop idle keys from `limiters` every `every`, so rotating client
/// addresses cannot grow the state stores without bound.
pub fn spawn_limiter_housekeeping(
    limiters: Vec<IpRateLimiter>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for limiter in &limiters {
                limiter.retain_recent();
                limiter.shrink_to_fit();
            }
            tracing::debug!(limiters = limiters.len(), "Pruned idle rate limit keys");
        }
    })
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<IpRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(ip) = rate_limit.client_ip(&request) else {
        tracing::warn!("Could not determine client IP for rate limiting");
        return Ok(next.run(request).await);
    };

    match rate_limit.limiter.check_key(&ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(negative) => {
            let wait_time = negative.wait_time_from(DefaultClock::default().now());
            tracing::warn!(client_ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            Err(AppError::TooManyRequests(
                "Too many requests from this IP. Please try again later.".to_string(),
                Some(wait_time.as_secs().max(1)),
            ))
        }
    }
}
