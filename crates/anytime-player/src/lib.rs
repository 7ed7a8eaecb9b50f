//! anytime-player - record, edit and replay desktop macros
//!
//! A macro is an ordered list of clicks and key chords, each followed by a
//! delay. Playback runs on its own thread and can be stopped mid-delay;
//! a scheduler can start it at a time of day.

pub mod action;
pub mod list;
pub mod position;
pub mod replay;
pub mod scheduler;
pub mod status;
pub mod storage;

pub use action::{parse_chord, Action, Delay};
pub use list::ActionList;
pub use position::{PositionReporter, PositionStream, ReporterConfig};
pub use replay::{PlaybackConfig, PlaybackEngine, StopOutcome, MAX_POLL_INTERVAL};
pub use scheduler::{parse_time_of_day, seconds_until, Scheduler};
pub use status::{Notification, RunOutcome, Status};
pub use storage::MacroStorage;

pub use crossbeam_channel::{Receiver, Sender};

pub mod prelude {
    pub use crate::action::{parse_chord, Action, Delay};
    pub use crate::list::ActionList;
    pub use crate::position::{PositionReporter, PositionStream, ReporterConfig};
    pub use crate::replay::{PlaybackConfig, PlaybackEngine, StopOutcome};
    pub use crate::scheduler::{parse_time_of_day, Scheduler};
    pub use crate::status::{Notification, RunOutcome, Status};
    pub use crate::storage::MacroStorage;
}
