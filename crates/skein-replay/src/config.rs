use std::time::Duration;

/// Tunables for both replay variants.
///
/// The defaults mirror the production values; they are configuration, not
/// contracts. Tests shrink them through the builder methods.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Position deltas outside `[0, drift_tolerance_ms]` trigger a resync.
    pub drift_tolerance_ms: i64,
    /// Period of the drift watchdog polling the external clock.
    pub watchdog_interval: Duration,
    /// A message reached later than this past its target offset is dropped
    /// instead of delivered (remote variant only).
    pub staleness_ms: i64,
    /// Queue occupancy at or below which a prefetch of the next page starts.
    pub low_water_mark: usize,
    /// Delay before retrying a failed page fetch.
    pub fetch_retry_delay: Duration,
    /// Poll interval while the queue is empty and a fetch is in flight.
    pub idle_poll: Duration,
    /// How far behind the start position the local variant keeps messages
    /// when (re)filtering its list.
    pub local_rewind_ms: i64,
    pub event_channel_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_ms: 20_000,
            watchdog_interval: Duration::from_secs(1),
            staleness_ms: 20_000,
            low_water_mark: 25,
            fetch_retry_delay: Duration::from_secs(1),
            idle_poll: Duration::from_millis(100),
            local_rewind_ms: 20_000,
            event_channel_capacity: 256,
        }
    }
}

impl ReplayConfig {
    pub fn with_drift_tolerance_ms(mut self, ms: i64) -> Self {
        self.drift_tolerance_ms = ms;
        self
    }

    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    pub fn with_staleness_ms(mut self, ms: i64) -> Self {
        self.staleness_ms = ms;
        self
    }

    pub fn with_low_water_mark(mut self, mark: usize) -> Self {
        self.low_water_mark = mark;
        self
    }

    pub fn with_fetch_retry_delay(mut self, delay: Duration) -> Self {
        self.fetch_retry_delay = delay;
        self
    }

    pub fn with_local_rewind_ms(mut self, ms: i64) -> Self {
        self.local_rewind_ms = ms;
        self
    }
}
