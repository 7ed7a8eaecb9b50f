use anytime_core::{Clock, InputInjector, Result};
use anytime_player::*;
use chrono::{Duration as TimeDelta, NaiveTime};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Click(i32, i32),
    Chord(Vec<String>),
}

#[derive(Default)]
struct RecordingInjector {
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl InputInjector for RecordingInjector {
    fn click(&self, x: i32, y: i32) -> Result<()> {
        self.calls.lock().push((Instant::now(), Call::Click(x, y)));
        Ok(())
    }

    fn send_chord(&self, keys: &[String]) -> Result<()> {
        self.calls.lock().push((Instant::now(), Call::Chord(keys.to_vec())));
        Ok(())
    }
}

struct FixedClock(NaiveTime);

impl Clock for FixedClock {
    fn now_time_of_day(&self) -> NaiveTime {
        self.0
    }
}

fn click_then_copy() -> ActionList {
    let mut list = ActionList::new();
    list.append(Action::mouse_click(10, 10, Delay::from_secs(0)));
    list.append(Action::key_combo(["ctrl", "c"], Delay::from_secs(1)).unwrap());
    list
}

fn wait_finished(rx: &Receiver<Notification>, within: Duration) -> RunOutcome {
    let deadline = Instant::now() + within;
    loop {
        let left = deadline
            .checked_duration_since(Instant::now())
            .expect("run did not finish in time");
        match rx.recv_timeout(left) {
            Ok(Notification::Finished(outcome)) => return outcome,
            Ok(_) => continue,
            Err(e) => panic!("notification channel failed: {}", e),
        }
    }
}

#[test]
fn click_wait_chord_then_complete() {
    let injector = Arc::new(RecordingInjector::default());
    let (tx, rx) = crossbeam_channel::unbounded();
    let engine = PlaybackEngine::new(injector.clone()).notify(tx);

    let list = click_then_copy();
    let started = Instant::now();
    engine.start(list.snapshot()).unwrap();
    let outcome = wait_finished(&rx, Duration::from_secs(3));
    assert!(outcome.is_completed());

    let calls = injector.calls.lock().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, Call::Click(10, 10));
    assert_eq!(calls[1].1, Call::Chord(vec!["ctrl".into(), "c".into()]));
    assert!(calls[0].0 - started < Duration::from_millis(200));
    let gap = calls[1].0 - calls[0].0;
    assert!(gap < Duration::from_millis(200), "chord should follow the zero-delay click");
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[test]
fn stop_during_wait_skips_the_chord() {
    let injector = Arc::new(RecordingInjector::default());
    let (tx, rx) = crossbeam_channel::unbounded();
    let engine = PlaybackEngine::new(injector.clone()).notify(tx);

    let mut list = ActionList::new();
    list.append(Action::mouse_click(10, 10, Delay::from_secs(1)));
    list.append(Action::key_combo(["ctrl", "c"], Delay::from_secs(0)).unwrap());

    engine.start(list.snapshot()).unwrap();
    thread::sleep(Duration::from_millis(500));
    let stop_at = Instant::now();
    assert_eq!(engine.stop(), StopOutcome::Stopping);

    let outcome = wait_finished(&rx, Duration::from_secs(2));
    assert!(outcome.is_stopped());
    assert!(stop_at.elapsed() <= MAX_POLL_INTERVAL + Duration::from_millis(50));
    assert!(!engine.is_running());

    let calls: Vec<Call> = injector.calls.lock().iter().map(|(_, c)| c.clone()).collect();
    assert_eq!(calls, vec![Call::Click(10, 10)]);
}

#[test]
fn edits_after_start_do_not_reach_the_run() {
    let injector = Arc::new(RecordingInjector::default());
    let engine = PlaybackEngine::new(injector.clone());

    let mut list = click_then_copy();
    engine.start(list.snapshot()).unwrap();
    list.remove_at(1).unwrap();
    list.append(Action::mouse_click(99, 99, Delay::from_secs(0)));

    assert!(engine.wait().unwrap().is_completed());
    let calls: Vec<Call> = injector.calls.lock().iter().map(|(_, c)| c.clone()).collect();
    assert_eq!(
        calls,
        vec![Call::Click(10, 10), Call::Chord(vec!["ctrl".into(), "c".into()])]
    );
}

#[test]
fn scheduled_start_plays_the_macro() {
    let injector = Arc::new(RecordingInjector::default());
    let (tx, rx) = crossbeam_channel::unbounded();
    let engine = Arc::new(PlaybackEngine::new(injector.clone()).notify(tx.clone()));

    let now = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    let scheduler = Scheduler::new(Arc::new(FixedClock(now))).notify(tx);

    let snapshot = vec![Action::mouse_click(1, 2, Delay::from_secs(0))];
    let fire_engine = Arc::clone(&engine);
    scheduler
        .schedule(now + TimeDelta::seconds(1), move || {
            let _ = fire_engine.start(snapshot);
        })
        .unwrap();

    let outcome = wait_finished(&rx, Duration::from_secs(3));
    assert!(outcome.is_completed());
    let calls: Vec<Call> = injector.calls.lock().iter().map(|(_, c)| c.clone()).collect();
    assert_eq!(calls, vec![Call::Click(1, 2)]);
}

#[test]
fn saved_macro_replays_identically() {
    let dir = tempfile::tempdir().unwrap();
    let storage = MacroStorage::with_dir(dir.path()).unwrap();
    storage.save(&click_then_copy(), "copy.json").unwrap();

    let loaded = storage.load("copy.json").unwrap();
    assert_eq!(loaded, click_then_copy());
    assert_eq!(
        loaded.renderings(),
        vec![
            "Mouse click at (10, 10) - delay: 0h 0m 0s",
            "Key input: ctrl + c - delay: 0h 0m 1s",
        ]
    );
}
