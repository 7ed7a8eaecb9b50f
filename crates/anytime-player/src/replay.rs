//! Macro playback on a background thread with cooperative stop

use crate::action::{Action, Delay};
use crate::status::{Notification, RunOutcome, Status};
use anytime_core::{Error, ErrorCode, InputInjector, Result};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest gap between two looks at the stop flag
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Delay divisor (1.0 = as recorded, 2.0 = delays halved)
    pub speed: f64,
    /// How often a running delay checks for a stop request
    pub poll_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl PlaybackConfig {
    /// Delay after speed scaling, saturating at `Duration::MAX`
    fn scaled(&self, delay: Delay) -> Duration {
        let secs = delay.total_seconds();
        if self.speed == 1.0 || !(self.speed > 0.0 && self.speed.is_finite()) {
            return Duration::from_secs(secs);
        }
        Duration::try_from_secs_f64(secs as f64 / self.speed).unwrap_or(Duration::MAX)
    }

    fn poll(&self) -> Duration {
        self.poll_interval.clamp(Duration::from_millis(1), MAX_POLL_INTERVAL)
    }
}

/// Result of asking playback to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A run was in flight and will wind down within one poll interval
    Stopping,
    NothingRunning,
}

struct Run {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<RunOutcome>>,
}

/// Plays one snapshot of actions at a time
pub struct PlaybackEngine {
    injector: Arc<dyn InputInjector>,
    config: PlaybackConfig,
    notify: Option<Sender<Notification>>,
    running: Arc<AtomicBool>,
    run: Mutex<Option<Run>>,
}

impl PlaybackEngine {
    pub fn new(injector: Arc<dyn InputInjector>) -> Self {
        Self::with_config(injector, PlaybackConfig::default())
    }

    pub fn with_config(injector: Arc<dyn InputInjector>, config: PlaybackConfig) -> Self {
        Self {
            injector,
            config,
            notify: None,
            running: Arc::new(AtomicBool::new(false)),
            run: Mutex::new(None),
        }
    }

    /// Send status and progress to this channel
    pub fn notify(mut self, tx: Sender<Notification>) -> Self {
        self.notify = Some(tx);
        self
    }

    /// Set playback speed (1.0 = as recorded)
    pub fn speed(mut self, speed: f64) -> Self {
        self.config.speed = speed;
        self
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin playing `actions` on a new thread
    pub fn start(&self, actions: Vec<Action>) -> Result<()> {
        let mut run = self.run.lock();
        if self.is_running() {
            return Err(Error::already_running());
        }
        if actions.is_empty() {
            return Err(Error::empty_macro());
        }

        let stop = Arc::new(AtomicBool::new(false));
        self.running.store(true, Ordering::SeqCst);
        info!(actions = actions.len(), speed = self.config.speed, "starting playback");
        emit(&self.notify, Notification::Status(Status::Running));

        let worker = Worker {
            actions,
            injector: Arc::clone(&self.injector),
            config: self.config.clone(),
            notify: self.notify.clone(),
            stop: Arc::clone(&stop),
            running: Arc::clone(&self.running),
        };
        let spawned = thread::Builder::new()
            .name("anytime-playback".into())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                *run = Some(Run {
                    stop,
                    thread: Some(handle),
                });
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                emit(&self.notify, Notification::Status(Status::Idle));
                Err(e.into())
            }
        }
    }

    /// Ask the running playback to stop; never blocks on the worker
    ///
    /// The worker reports `Status::Stopped` once it has actually wound down.
    pub fn stop(&self) -> StopOutcome {
        let run = self.run.lock();
        match run.as_ref() {
            Some(r) if self.is_running() => {
                r.stop.store(true, Ordering::SeqCst);
                info!("stop requested");
                StopOutcome::Stopping
            }
            _ => StopOutcome::NothingRunning,
        }
    }

    /// Block until the latest run ends and return how it ended
    ///
    /// Returns `None` when there is no run left to wait for.
    pub fn wait(&self) -> Option<RunOutcome> {
        // Take the handle out so stop() stays callable while we join
        let handle = self.run.lock().as_mut().and_then(|r| r.thread.take())?;
        Some(handle.join().unwrap_or_else(|_| {
            RunOutcome::Failed(Error::new(ErrorCode::InjectionFailure, "playback thread panicked"))
        }))
    }
}

struct Worker {
    actions: Vec<Action>,
    injector: Arc<dyn InputInjector>,
    config: PlaybackConfig,
    notify: Option<Sender<Notification>>,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) -> RunOutcome {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.play())).unwrap_or_else(|_| {
            RunOutcome::Failed(Error::new(ErrorCode::InjectionFailure, "input injection panicked"))
        });

        match &outcome {
            RunOutcome::Completed => info!("playback completed"),
            RunOutcome::Stopped => info!("playback stopped"),
            RunOutcome::Failed(e) => warn!(error = %e, "playback failed"),
        }
        self.running.store(false, Ordering::SeqCst);
        if outcome.is_stopped() {
            emit(&self.notify, Notification::Status(Status::Stopped));
        }
        emit(&self.notify, Notification::Finished(outcome.clone()));
        emit(&self.notify, Notification::Status(Status::Idle));
        outcome
    }

    fn play(&self) -> RunOutcome {
        for (index, action) in self.actions.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                return RunOutcome::Stopped;
            }

            if let Err(e) = self.dispatch(action) {
                return RunOutcome::Failed(e);
            }
            debug!(index, %action, "dispatched");
            emit(
                &self.notify,
                Notification::Dispatched {
                    index,
                    action: action.clone(),
                },
            );

            if !self.wait(self.config.scaled(action.delay())) {
                return RunOutcome::Stopped;
            }
        }
        RunOutcome::Completed
    }

    fn dispatch(&self, action: &Action) -> Result<()> {
        let result = match action {
            Action::MouseClick { x, y, .. } => self.injector.click(*x, *y),
            Action::KeyCombo { keys, .. } => self.injector.send_chord(keys),
        };
        result.map_err(|e| match e.code {
            ErrorCode::InjectionFailure => e,
            code => Error::injection_failure(&action.render(), &e.message)
                .with_context(serde_json::json!({ "cause": code })),
        })
    }

    /// Sleep in poll-sized slices; false if a stop arrived first
    ///
    /// A delay too long for `Instant` has no deadline and only ends on stop.
    fn wait(&self, total: Duration) -> bool {
        let deadline = Instant::now().checked_add(total);
        let poll = self.config.poll();
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return false;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    (deadline - now).min(poll)
                }
                None => poll,
            };
            thread::sleep(slice);
        }
    }
}

fn emit(notify: &Option<Sender<Notification>>, notification: Notification) {
    if let Some(tx) = notify {
        let _ = tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Click(i32, i32),
        Chord(Vec<String>),
    }

    #[derive(Default)]
    struct FakeInjector {
        calls: Mutex<Vec<(Instant, Call)>>,
        fail_chords: bool,
    }

    impl FakeInjector {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
        }
    }

    impl InputInjector for FakeInjector {
        fn click(&self, x: i32, y: i32) -> Result<()> {
            self.calls.lock().push((Instant::now(), Call::Click(x, y)));
            Ok(())
        }

        fn send_chord(&self, keys: &[String]) -> Result<()> {
            if self.fail_chords {
                return Err(Error::unknown_key(&keys[0]));
            }
            self.calls.lock().push((Instant::now(), Call::Chord(keys.to_vec())));
            Ok(())
        }
    }

    fn engine(injector: &Arc<FakeInjector>) -> (PlaybackEngine, Receiver<Notification>) {
        let (tx, rx) = unbounded();
        let injector: Arc<dyn InputInjector> = injector.clone();
        (PlaybackEngine::new(injector).notify(tx), rx)
    }

    fn finished(rx: &Receiver<Notification>, within: Duration) -> Option<RunOutcome> {
        let deadline = Instant::now() + within;
        loop {
            let left = deadline.checked_duration_since(Instant::now())?;
            match rx.recv_timeout(left) {
                Ok(Notification::Finished(outcome)) => return Some(outcome),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    #[test]
    fn plays_all_actions_in_order() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        let actions = vec![
            Action::mouse_click(1, 2, Delay::from_secs(0)),
            Action::key_combo(["alt", "tab"], Delay::from_secs(0)).unwrap(),
            Action::mouse_click(3, 4, Delay::from_secs(0)),
        ];

        engine.start(actions).unwrap();
        let outcome = finished(&rx, Duration::from_secs(2)).expect("run did not finish");

        assert!(outcome.is_completed());
        assert!(!engine.is_running());
        assert_eq!(
            injector.calls(),
            vec![
                Call::Click(1, 2),
                Call::Chord(vec!["alt".into(), "tab".into()]),
                Call::Click(3, 4)
            ]
        );
    }

    #[test]
    fn start_while_running_is_rejected() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        engine
            .start(vec![Action::mouse_click(0, 0, Delay::from_secs(1))])
            .unwrap();

        let err = engine
            .start(vec![Action::mouse_click(9, 9, Delay::from_secs(0))])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyRunning);

        let outcome = finished(&rx, Duration::from_secs(3)).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(injector.calls(), vec![Call::Click(0, 0)]);
    }

    #[test]
    fn empty_macro_is_reported() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, _rx) = engine(&injector);
        assert_eq!(engine.start(Vec::new()).unwrap_err().code, ErrorCode::EmptyMacro);
        assert!(!engine.is_running());
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        assert_eq!(engine.stop(), StopOutcome::NothingRunning);
        assert_eq!(engine.stop(), StopOutcome::NothingRunning);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_interrupts_a_long_delay() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        engine
            .start(vec![
                Action::mouse_click(5, 5, Delay::from_secs(60)),
                Action::mouse_click(6, 6, Delay::from_secs(0)),
            ])
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        assert_eq!(engine.stop(), StopOutcome::Stopping);

        let outcome = finished(&rx, MAX_POLL_INTERVAL + Duration::from_millis(100)).unwrap();
        assert!(outcome.is_stopped());
        assert!(!engine.is_running());
        assert_eq!(injector.calls(), vec![Call::Click(5, 5)]);
        assert_eq!(engine.stop(), StopOutcome::NothingRunning);
    }

    #[test]
    fn injection_failure_aborts_the_run() {
        let injector = Arc::new(FakeInjector {
            fail_chords: true,
            ..Default::default()
        });
        let (engine, rx) = engine(&injector);
        engine
            .start(vec![
                Action::key_combo(["ctrl", "c"], Delay::from_secs(0)).unwrap(),
                Action::mouse_click(1, 1, Delay::from_secs(0)),
            ])
            .unwrap();

        match finished(&rx, Duration::from_secs(2)).unwrap() {
            RunOutcome::Failed(e) => {
                assert_eq!(e.code, ErrorCode::InjectionFailure);
                assert!(e.message.contains("Unknown key: ctrl"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn speed_shortens_delays() {
        let injector = Arc::new(FakeInjector::default());
        let (tx, rx) = unbounded();
        let engine = PlaybackEngine::new(injector.clone()).speed(10.0).notify(tx);

        let started = Instant::now();
        engine
            .start(vec![
                Action::mouse_click(0, 0, Delay::from_secs(2)),
                Action::mouse_click(1, 1, Delay::from_secs(0)),
            ])
            .unwrap();
        assert!(finished(&rx, Duration::from_secs(2)).unwrap().is_completed());
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[test]
    fn wait_returns_outcome_and_engine_is_reusable() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, _rx) = engine(&injector);
        engine
            .start(vec![Action::mouse_click(1, 1, Delay::from_secs(0))])
            .unwrap();
        assert!(engine.wait().unwrap().is_completed());
        assert!(engine.wait().is_none());

        engine
            .start(vec![Action::mouse_click(2, 2, Delay::from_secs(0))])
            .unwrap();
        assert!(engine.wait().unwrap().is_completed());
        assert_eq!(injector.calls(), vec![Call::Click(1, 1), Call::Click(2, 2)]);
    }

    #[test]
    fn status_notifications_bracket_the_run() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        engine
            .start(vec![Action::mouse_click(1, 1, Delay::from_secs(0))])
            .unwrap();
        engine.wait();

        let seen: Vec<Notification> = rx.try_iter().collect();
        assert!(matches!(seen.first(), Some(Notification::Status(Status::Running))));
        assert!(matches!(seen[1], Notification::Dispatched { index: 0, .. }));
        assert!(matches!(seen[2], Notification::Finished(RunOutcome::Completed)));
        assert!(matches!(seen.last(), Some(Notification::Status(Status::Idle))));
    }

    #[test]
    fn huge_saved_delay_waits_until_stopped() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        let list = crate::list::ActionList::from_json(
            r#"[{"type":"mouse","x":1,"y":1,"delay":18446744073709551615}]"#,
        )
        .unwrap();
        engine.start(list.snapshot()).unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(engine.is_running());
        assert_eq!(engine.stop(), StopOutcome::Stopping);

        let outcome = finished(&rx, MAX_POLL_INTERVAL + Duration::from_millis(200)).unwrap();
        assert!(outcome.is_stopped(), "got {:?}", outcome);
        assert_eq!(injector.calls(), vec![Call::Click(1, 1)]);
    }

    #[test]
    fn tiny_speed_waits_until_stopped() {
        let injector = Arc::new(FakeInjector::default());
        let (tx, rx) = unbounded();
        let engine = PlaybackEngine::new(injector.clone()).speed(1e-300).notify(tx);
        engine
            .start(vec![Action::mouse_click(2, 2, Delay::from_secs(1))])
            .unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(engine.is_running());
        engine.stop();
        let outcome = finished(&rx, MAX_POLL_INTERVAL + Duration::from_millis(200)).unwrap();
        assert!(outcome.is_stopped(), "got {:?}", outcome);
    }

    #[test]
    fn scaled_delay_saturates() {
        let config = PlaybackConfig {
            speed: 1e-300,
            ..Default::default()
        };
        assert_eq!(config.scaled(Delay::from_secs(1)), Duration::MAX);
        assert_eq!(
            PlaybackConfig::default().scaled(Delay::from_secs(u64::MAX)),
            Duration::from_secs(u64::MAX)
        );
        let fast = PlaybackConfig {
            speed: 4.0,
            ..Default::default()
        };
        assert_eq!(fast.scaled(Delay::from_secs(2)), Duration::from_millis(500));
    }

    #[test]
    fn stopped_status_comes_from_the_worker() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        engine
            .start(vec![Action::mouse_click(1, 1, Delay::from_secs(60))])
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        engine.stop();
        assert!(engine.wait().unwrap().is_stopped());

        let statuses: Vec<Status> = rx
            .try_iter()
            .filter_map(|n| match n {
                Notification::Status(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![Status::Running, Status::Stopped, Status::Idle]);
    }

    #[test]
    fn stop_after_completion_leaves_status_idle() {
        let injector = Arc::new(FakeInjector::default());
        let (engine, rx) = engine(&injector);
        engine
            .start(vec![Action::mouse_click(1, 1, Delay::from_secs(0))])
            .unwrap();
        assert!(engine.wait().unwrap().is_completed());
        engine.stop();

        let last = rx.try_iter().last();
        assert!(matches!(last, Some(Notification::Status(Status::Idle))));
    }
}
