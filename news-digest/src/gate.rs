use chrono::{DateTime, FixedOffset, Timelike};

/// Decides whether a triggered run should proceed.
pub trait RunGate: Send + Sync {
    fn should_run(&self, now: DateTime<FixedOffset>) -> bool;
}

/// Admits runs whose display-timezone hour is a multiple of the interval.
/// The scheduler fires hourly; this thins it to the configured cadence.
#[derive(Debug, Clone, Copy)]
pub struct IntervalGate {
    interval_hours: u32,
}

impl IntervalGate {
    pub fn new(interval_hours: u32) -> Self {
        Self { interval_hours }
    }
}

impl RunGate for IntervalGate {
    fn should_run(&self, now: DateTime<FixedOffset>) -> bool {
        self.interval_hours <= 1 || now.hour() % self.interval_hours == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRun;

impl RunGate for AlwaysRun {
    fn should_run(&self, _now: DateTime<FixedOffset>) -> bool {
        true
    }
}
