//! Arithmetic deadline sequence.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline generator for a fixed-rate loop
///
/// Deadlines form the arithmetic sequence `start + k * interval`, anchored
/// at creation time. A slow tick does not shift later deadlines: the loop
/// waits zero time until the schedule is caught up, and cadence drift does
/// not accumulate. The sequence is kept by adding exactly one interval per
/// advance, so it stays strictly non-decreasing for any tick count.
#[derive(Debug, Clone)]
pub struct Ticker {
    next: Instant,
    interval: Duration,
    tick: u64,
}

impl Ticker {
    /// Create a ticker anchored at now; the first deadline is one interval
    /// in the future
    pub fn new(interval: Duration) -> Self {
        Self::anchored_at(Instant::now(), interval)
    }

    /// Create a ticker anchored at an explicit instant
    pub fn anchored_at(start: Instant, interval: Duration) -> Self {
        Self {
            next: start,
            interval,
            tick: 0,
        }
    }

    /// Tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of deadlines handed out so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Deadline of the next tick without advancing
    pub fn peek_deadline(&self) -> Instant {
        self.next + self.interval
    }

    /// Advance to the next tick and return its deadline
    pub fn advance(&mut self) -> Instant {
        self.tick += 1;
        self.next += self.interval;
        self.next
    }

    /// How far past `deadline` the current instant is; zero if on time
    pub fn lag(deadline: Instant) -> Duration {
        Instant::now().saturating_duration_since(deadline)
    }
}
