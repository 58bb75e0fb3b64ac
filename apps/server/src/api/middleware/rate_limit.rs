//! Per-service rate limiting
//!
//! One token bucket shared by every request to the service. The limiter is
//! owned by [`AppState`], so each router instance gets its own quota.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

use crate::config::RateLimitConfig;
use crate::state::AppState;
use crate::Error;

pub type ServiceRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Build the limiter, or `None` when rate limiting is disabled.
pub fn build_rate_limiter(config: &RateLimitConfig) -> Option<ServiceRateLimiter> {
    if !config.enabled {
        return None;
    }

    let quota = Quota::per_second(NonZeroU32::new(config.per_second).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN));
    Some(RateLimiter::direct(quota))
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_deref() else {
        return next.run(req).await;
    };

    match limiter.check() {
        Ok(()) => next.run(req).await,
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);

            crate::metrics::HTTP_REQUESTS_THROTTLED_TOTAL
                .with_label_values(&[&crate::metrics::sanitize_path(req.uri().path())])
                .inc();
            tracing::debug!(path = %req.uri().path(), retry_after, "Request throttled");

            let mut response = Error::RateLimited.into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
