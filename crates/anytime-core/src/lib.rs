//! anytime-core - capabilities the macro player drives
//!
//! Input injection, pointer queries and the wall clock, each behind a trait
//! so playback and scheduling can run against the real desktop or a fake.
//!
//! ## Platform Support
//!
//! - **macOS**, **Windows**, **Linux (X11)**: via enigo

pub mod clock;
pub mod error;
pub mod input;

pub use clock::{Clock, SystemClock};
pub use error::{Error, ErrorCode, Result};
pub use input::{Desktop, InputInjector, PointerSource, Position};

pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::input::{Desktop, InputInjector, PointerSource, Position};
}
