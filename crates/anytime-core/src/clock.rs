//! Wall-clock time of day

use chrono::{Local, NaiveTime};

/// Source of the current local time of day
pub trait Clock: Send + Sync {
    fn now_time_of_day(&self) -> NaiveTime;
}

/// The local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_time_of_day(&self) -> NaiveTime {
        Local::now().time()
    }
}
