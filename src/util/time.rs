//! Clock helpers for the server and the client simulation

use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Client frame cadence (~60 Hz, one simulation tick per frame)
pub const CLIENT_FRAME: Duration = Duration::from_micros(1_000_000 / 60);

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// Wall clock in milliseconds; stamps inbound events for lag warnings
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Record process start. Later calls keep the first instant.
pub fn init_server_time() {
    STARTED_AT.get_or_init(Instant::now);
}

/// Seconds since [`init_server_time`], or 0 if it was never called
pub fn uptime_secs() -> u64 {
    STARTED_AT.get().map_or(0, |start| start.elapsed().as_secs())
}

/// Monotonic simulation clock. `now_ms` values handed to the sim come from
/// here so cooldowns and bot intervals ignore wall-clock jumps.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    origin: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_starts_near_zero() {
        init_server_time();
        assert!(uptime_secs() < 5);
    }

    #[test]
    fn timer_is_monotonic() {
        let timer = Timer::new();
        let first = timer.elapsed_ms();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed_ms() >= first);
    }

    #[test]
    fn client_frame_is_sixty_hertz() {
        assert_eq!(CLIENT_FRAME.as_micros(), 16_666);
    }
}
