use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(75);

/// Gates engine ticks to at most one per `tick_interval`, however often frames
/// arrive. `last_tick` only moves when a tick fires or a run begins.
#[derive(Debug)]
pub struct TickClock {
    last_tick: Instant,
    tick_interval: Duration,
}

impl TickClock {
    pub fn new(tick_interval: Duration, now: Instant) -> Self {
        Self {
            last_tick: now,
            tick_interval,
        }
    }

    pub fn anchor(&mut self, now: Instant) {
        self.last_tick = now;
    }

    pub fn try_tick(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_tick) < self.tick_interval {
            return false;
        }
        self.last_tick = now;
        true
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}
