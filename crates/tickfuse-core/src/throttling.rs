use std::fmt::{Debug, Formatter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Non-blocking call budget for one provider: at most `limit` calls per
/// `window`, refilled evenly. Callers that find it exhausted fail fast.
#[derive(Clone)]
pub struct RateBudget {
    limiter: Arc<DirectRateLimiter>,
    window: Duration,
    limit: u32,
}

impl RateBudget {
    pub fn new(window: Duration, limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
            window,
            limit,
        }
    }

    /// Takes one call from the budget, or returns `false` without waiting.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Debug for RateBudget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget")
            .field("window", &self.window)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Windows beyond a day are treated as a day.
const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);

    let window = window.min(MAX_WINDOW);
    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::try_from_secs_f64(seconds_per_cell).unwrap_or(MAX_WINDOW);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_the_burst_is_spent() {
        let budget = RateBudget::new(Duration::from_secs(60), 2);

        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        let budget = RateBudget::new(Duration::from_secs(60), 0);

        assert_eq!(budget.limit(), 1);
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
    }

    #[test]
    fn oversized_window_is_clamped_instead_of_panicking() {
        let budget = RateBudget::new(Duration::from_secs(u64::MAX), 1);

        assert_eq!(budget.window(), Duration::from_secs(u64::MAX));
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
    }

    #[test]
    fn clones_share_one_budget() {
        let budget = RateBudget::new(Duration::from_secs(60), 1);
        let clone = budget.clone();

        assert!(budget.try_acquire());
        assert!(!clone.try_acquire());
    }
}
