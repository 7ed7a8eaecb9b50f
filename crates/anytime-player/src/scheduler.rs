//! One-shot trigger at a wall-clock time of day

use crate::status::{Notification, Status};
use anytime_core::{Clock, Error, Result};
use chrono::{NaiveTime, Timelike};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole seconds from `now` until the next occurrence of `at`
///
/// A time earlier than `now` means tomorrow. Exactly `now` is ambiguous and
/// rejected.
pub fn seconds_until(now: NaiveTime, at: NaiveTime) -> Result<u64> {
    let diff = i64::from(at.num_seconds_from_midnight()) - i64::from(now.num_seconds_from_midnight());
    let secs = diff.rem_euclid(SECONDS_PER_DAY);
    if secs == 0 {
        return Err(Error::invalid_schedule("Pick a time in the future, not now"));
    }
    Ok(secs as u64)
}

/// Parse "14:30", "14:30:05", "2:30 PM" or "02:30:05 pm"
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime> {
    let text = text.trim();
    ["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| {
            Error::invalid_schedule(format!("Cannot read '{}' as a time of day", text))
                .with_suggestions(vec!["Use HH:MM[:SS] or hh:mm[:ss] AM/PM".into()])
        })
}

struct Pending {
    at: NaiveTime,
    // Dropping this sender disarms the timer
    _cancel: Sender<()>,
    fired: Arc<AtomicBool>,
}

/// Holds at most one armed timer
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    notify: Option<Sender<Notification>>,
    pending: Mutex<Option<Pending>>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            notify: None,
            pending: Mutex::new(None),
        }
    }

    pub fn notify(mut self, tx: Sender<Notification>) -> Self {
        self.notify = Some(tx);
        self
    }

    /// Arm a timer that calls `on_fire` once at `at`
    ///
    /// An earlier timer that has not fired yet is disarmed and replaced.
    /// Returns how long until the new timer fires.
    pub fn schedule<F>(&self, at: NaiveTime, on_fire: F) -> Result<Duration>
    where
        F: FnOnce() + Send + 'static,
    {
        let secs = seconds_until(self.clock.now_time_of_day(), at)?;
        let delay = Duration::from_secs(secs);

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = Arc::clone(&fired);

        thread::Builder::new()
            .name("anytime-schedule".into())
            .spawn(move || match cancel_rx.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => {
                    fired_flag.store(true, Ordering::SeqCst);
                    info!(%at, "schedule fired");
                    on_fire();
                }
                _ => debug!(%at, "schedule disarmed"),
            })?;

        let mut pending = self.pending.lock();
        if let Some(old) = pending.as_ref() {
            if !old.fired.load(Ordering::SeqCst) {
                warn!(old = %old.at, new = %at, "replacing pending schedule");
            }
        }
        *pending = Some(Pending {
            at,
            _cancel: cancel_tx,
            fired,
        });
        info!(%at, in_secs = secs, "schedule armed");
        if let Some(tx) = &self.notify {
            let _ = tx.send(Notification::Status(Status::Scheduled(at)));
        }
        Ok(delay)
    }

    /// Disarm the pending timer; false if nothing was waiting to fire
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(p) => !p.fired.load(Ordering::SeqCst),
            None => false,
        }
    }

    /// Time of day the armed timer will fire at
    pub fn pending(&self) -> Option<NaiveTime> {
        self.pending
            .lock()
            .as_ref()
            .filter(|p| !p.fired.load(Ordering::SeqCst))
            .map(|p| p.at)
    }
}
