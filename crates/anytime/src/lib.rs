//! # anytime
//!
//! Record mouse clicks and keyboard shortcuts, each followed by a delay,
//! and replay them now or at a time of day.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anytime::prelude::*;
//! use std::sync::Arc;
//!
//! let mut list = ActionList::new();
//! list.append(Action::mouse_click(200, 300, Delay::from_secs(1)));
//! list.append(Action::capture_keys("Ctrl+V", Delay::from_secs(0))?);
//!
//! let engine = PlaybackEngine::new(Arc::new(Desktop::new()));
//! engine.start(list.snapshot())?;
//! engine.wait();
//! # Ok::<(), anytime::Error>(())
//! ```

// Re-export capabilities
pub use anytime_core::*;

// Re-export the player
pub use anytime_player as player;

pub use anytime_player::{
    parse_chord, parse_time_of_day, Action, ActionList, Delay, MacroStorage, Notification,
    PlaybackConfig, PlaybackEngine, PositionReporter, PositionStream, Receiver, ReporterConfig,
    RunOutcome, Scheduler, Sender, Status, StopOutcome,
};

/// Prelude - import everything you need
pub mod prelude {
    pub use anytime_core::prelude::*;
    pub use anytime_player::prelude::*;
}
