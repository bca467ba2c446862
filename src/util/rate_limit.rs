//! Per-connection inbound rate limiting

use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Default inbound frame budget per connection. Browsers report position
/// every animation frame, so this sits above a 60 Hz client.
pub const INPUT_RATE_LIMIT: u32 = 120;

/// Owned by one connection's reader; never shared between sockets.
pub struct ConnectionRateLimiter {
    inbound: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl ConnectionRateLimiter {
    /// A zero budget is treated as one frame per second.
    pub fn new(frames_per_second: u32) -> Self {
        let burst = NonZeroU32::new(frames_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inbound: RateLimiter::direct(Quota::per_second(burst)),
        }
    }

    /// True if the next inbound frame fits the budget
    pub fn check_input(&self) -> bool {
        self.inbound.check().is_ok()
    }
}
