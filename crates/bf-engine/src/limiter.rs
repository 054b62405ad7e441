//! Process-wide throttle on engine calls.

use std::num::NonZeroU32;
use std::time::Duration;

use bf_core::{Error, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Enforces a minimum spacing of `1 / max_rate` between the starts of any
/// two engine calls, across every task sharing the limiter.
///
/// The quota has a burst size of one, so an idle period never lets calls
/// through faster than the interval. Acquisition only delays, never fails.
pub struct RateLimiter {
    inner: DirectLimiter,
    interval: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing at most `max_rate` call starts per second.
    pub fn new(max_rate: f64) -> Result<Self> {
        if !(max_rate.is_finite() && max_rate > 0.0) {
            return Err(Error::Validation(format!(
                "max_rate must be a positive number, got {max_rate}"
            )));
        }
        let interval = Duration::from_secs_f64(1.0 / max_rate);
        let quota = Quota::with_period(interval)
            .ok_or_else(|| Error::Validation(format!("max_rate {max_rate} is too high")))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            inner: governor::RateLimiter::direct(quota),
            interval,
        })
    }

    /// Wait until the caller may start a call.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
