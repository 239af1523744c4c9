// Engine clock - anchors millisecond timestamps to the tokio clock
// Lets the driver convert engine deadlines into sleep targets, and lets
// paused-clock tests drive runs without real waits

use tokio::time::{Duration, Instant};

/// Monotonic millisecond clock shared by the engine's driver and the
/// host's frame-timestamping path
///
/// All engine timestamps are milliseconds since this clock's origin.
/// Under `tokio::time::pause` the clock advances deterministically with
/// the test runtime.
#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    origin: Instant,
}

impl EngineClock {
    pub fn new() -> Self {
        EngineClock {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock's origin
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// The tokio instant corresponding to an engine timestamp
    /// Timestamps before the origin clamp to the origin
    pub fn instant_at(&self, timestamp_ms: f64) -> Instant {
        self.origin + Duration::from_secs_f64((timestamp_ms / 1000.0).max(0.0))
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_tracks_paused_time() {
        let clock = EngineClock::new();
        assert!(clock.now_ms() < 1.0);

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!((clock.now_ms() - 1500.0).abs() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_round_trip() {
        let clock = EngineClock::new();
        let target = clock.instant_at(250.0);

        tokio::time::sleep_until(target).await;
        assert!((clock.now_ms() - 250.0).abs() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_timestamp_clamps_to_origin() {
        let clock = EngineClock::new();
        assert_eq!(clock.instant_at(-100.0), clock.instant_at(0.0));
    }
}
