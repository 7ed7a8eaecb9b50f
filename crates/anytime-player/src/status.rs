//! Notifications sent from background tasks to whoever drives the UI

use crate::action::Action;
use anytime_core::{Error, Position};
use chrono::NaiveTime;
use std::fmt;

/// What the status line shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Stopped,
    Scheduled(NaiveTime),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Running => f.write_str("Running"),
            Self::Stopped => f.write_str("Stopped"),
            Self::Scheduled(at) => write!(f, "Scheduled - runs at {}", at.format("%I:%M:%S %p")),
        }
    }
}

/// How a playback run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed(Error),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

#[derive(Debug, Clone)]
pub enum Notification {
    Status(Status),
    /// An action was injected; `index` is its position in the run
    Dispatched { index: usize, action: Action },
    Finished(RunOutcome),
    Position(Position),
}
