use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn wall_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Millisecond clock that never repeats or goes backwards.
///
/// History rows are keyed by timestamp, so two records written in the same
/// millisecond must still get distinct keys.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Start after a previously persisted timestamp.
    pub fn starting_after(last: i64) -> Self {
        Self { last }
    }

    pub fn last(&self) -> i64 {
        self.last
    }

    pub fn tick(&mut self) -> i64 {
        self.tick_at(wall_now())
    }

    pub fn tick_at(&mut self, now: i64) -> i64 {
        self.last = if now > self.last { now } else { self.last + 1 };
        self.last
    }

    /// Advance past a timestamp observed elsewhere.
    pub fn observe(&mut self, seen: i64) {
        if seen > self.last {
            self.last = seen;
        }
    }
}
