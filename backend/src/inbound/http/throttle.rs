//! Per-client request throttling for credential endpoints.
//!
//! A [`RateLimiter`] counts requests per client key in fixed windows. The
//! pipeline consults it for endpoints declared with
//! [`Endpoint::throttled`](super::pipeline::Endpoint::throttled) before the
//! guard runs, so throttled requests never reach authentication or auditing.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use mockable::Clock;

/// Message returned with status 429.
pub const THROTTLED: &str = "Request was throttled";

/// Requests allowed per client within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Window length.
    pub window: TimeDelta,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: TimeDelta::minutes(1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window request counter keyed by client address.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use chrono::TimeDelta;
/// use mockable::DefaultClock;
/// use stockdesk::inbound::http::throttle::{RateLimit, RateLimiter};
///
/// let limiter = RateLimiter::new(
///     RateLimit { max_requests: 1, window: TimeDelta::minutes(1) },
///     Arc::new(DefaultClock),
/// );
/// assert!(limiter.admit("203.0.113.9"));
/// assert!(!limiter.admit("203.0.113.9"));
/// assert!(limiter.admit("198.51.100.4"));
/// ```
pub struct RateLimiter {
    limit: RateLimit,
    clock: Arc<dyn Clock>,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// Limiter enforcing `limit`, reading time from `clock`.
    pub fn new(limit: RateLimit, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            clock,
            windows: DashMap::new(),
        }
    }

    /// Count one request from `client`, returning whether it is admitted.
    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, self.clock.utc())
    }

    fn admit_at(&self, client: &str, now: DateTime<Utc>) -> bool {
        let mut window = self.windows.entry(client.to_owned()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now - window.started_at >= self.limit.window {
            *window = Window {
                started_at: now,
                count: 0,
            };
        }
        if window.count >= self.limit.max_requests {
            return false;
        }
        window.count = window.count.saturating_add(1);
        true
    }
}
