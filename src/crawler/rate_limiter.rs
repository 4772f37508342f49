//! Single-slot interval gate for outbound requests
//!
//! Every caller of [`RateLimiter::wait`] queues on one async mutex, so grants
//! are serialized and spaced at least one interval apart regardless of how
//! many fetches are in flight.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Lowest accepted rate; anything slower is clamped to this
pub const MIN_RATE_PER_SECOND: f64 = 0.1;

#[derive(Debug)]
struct LimiterState {
    interval: Duration,
    last_grant: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Creates a limiter granting at most `per_second` calls per second
    pub fn new(per_second: f64) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                interval: interval_for(per_second),
                last_grant: None,
            }),
        }
    }

    /// Blocks until one full interval has elapsed since the previous grant
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_grant {
            let elapsed = last.elapsed();
            if elapsed < state.interval {
                sleep(state.interval - elapsed).await;
            }
        }

        state.last_grant = Some(Instant::now());
    }

    /// Raises the interval to at least `min_interval`; never shortens it
    pub async fn widen(&self, min_interval: Duration) {
        let mut state = self.state.lock().await;
        if min_interval > state.interval {
            state.interval = min_interval;
        }
    }

    pub async fn interval(&self) -> Duration {
        self.state.lock().await.interval
    }
}

fn interval_for(per_second: f64) -> Duration {
    let rate = if per_second.is_finite() {
        per_second.max(MIN_RATE_PER_SECOND)
    } else {
        MIN_RATE_PER_SECOND
    };
    Duration::from_secs_f64(1.0 / rate)
}
