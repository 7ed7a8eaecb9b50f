//! Live pointer position sampling

use crate::status::Notification;
use anytime_core::{PointerSource, Position, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Reporter configuration
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Time between two samples
    pub interval: Duration,
    /// Samples buffered for a slow reader before new ones are dropped
    pub buffer: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            buffer: 64,
        }
    }
}

/// Samples the pointer on a background thread
pub struct PositionReporter {
    config: ReporterConfig,
}

impl PositionReporter {
    pub fn new() -> Self {
        Self::with_config(ReporterConfig::default())
    }

    pub fn with_config(config: ReporterConfig) -> Self {
        Self { config }
    }

    /// Start sampling; runs until the stream is stopped or dropped
    pub fn stream(&self, source: Arc<dyn PointerSource>) -> Result<PositionStream> {
        let (tx, rx) = bounded(self.config.buffer.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let stop1 = Arc::clone(&stop);
        let interval = self.config.interval;

        let thread = thread::Builder::new()
            .name("anytime-position".into())
            .spawn(move || sample_loop(source, tx, stop1, interval))?;

        Ok(PositionStream {
            stop,
            rx,
            thread: Some(thread),
        })
    }
}

impl Default for PositionReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_loop(
    source: Arc<dyn PointerSource>,
    tx: Sender<Notification>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) {
    while !stop.load(Ordering::Relaxed) {
        match source.current_position() {
            Ok(pos) => match tx.try_send(Notification::Position(pos)) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => break,
            },
            Err(e) => warn!(error = %e, "pointer query failed"),
        }
        thread::sleep(interval);
    }
    debug!("position sampling ended");
}

/// Stream of `Notification::Position` samples
pub struct PositionStream {
    stop: Arc<AtomicBool>,
    rx: Receiver<Notification>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PositionStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }

    /// Underlying receiver (for select! etc)
    pub fn receiver(&self) -> &Receiver<Notification> {
        &self.rx
    }

    /// Next sample, waiting at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Position> {
        match self.rx.recv_timeout(timeout).ok()? {
            Notification::Position(pos) => Some(pos),
            _ => None,
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Iterator for PositionStream {
    type Item = Position;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop.load(Ordering::Relaxed) {
            return None;
        }
        match self.rx.recv().ok()? {
            Notification::Position(pos) => Some(pos),
            _ => None,
        }
    }
}

impl Drop for PositionStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
