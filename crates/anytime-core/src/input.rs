//! Keyboard and mouse input simulation
//!
//! Playback only ever talks to the desktop through [`InputInjector`] and
//! [`PointerSource`]. [`Desktop`] is the real implementation, backed by enigo.

use crate::error::{Error, Result};
use enigo::{Enigo, Key, KeyboardControllable, MouseButton, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Screen coordinates in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Injects synthetic input into the OS
pub trait InputInjector: Send + Sync {
    /// Left click at screen coordinates
    fn click(&self, x: i32, y: i32) -> Result<()>;

    /// Press every key together, in order, then release them in reverse
    fn send_chord(&self, keys: &[String]) -> Result<()>;
}

/// Reports where the pointer currently is
pub trait PointerSource: Send + Sync {
    fn current_position(&self) -> Result<Position>;
}

static ENIGO: Lazy<Mutex<Enigo>> = Lazy::new(|| Mutex::new(Enigo::new()));

// Gap between a key's down and up events, and between chord presses
const KEY_GAP: Duration = Duration::from_millis(10);

/// The real desktop, driven through enigo
#[derive(Debug, Clone, Copy, Default)]
pub struct Desktop;

impl Desktop {
    pub fn new() -> Self {
        Self
    }
}

impl InputInjector for Desktop {
    fn click(&self, x: i32, y: i32) -> Result<()> {
        debug!(x, y, "click");
        let mut en = ENIGO.lock();
        en.mouse_move_to(x, y);
        std::thread::sleep(KEY_GAP);
        en.mouse_click(MouseButton::Left);
        Ok(())
    }

    fn send_chord(&self, keys: &[String]) -> Result<()> {
        // Resolve everything first so a bad token never leaves keys held down
        let resolved = keys
            .iter()
            .map(|k| key_for(k).ok_or_else(|| Error::unknown_key(k)))
            .collect::<Result<Vec<_>>>()?;
        debug!(?keys, "chord");

        let mut en = ENIGO.lock();
        for key in &resolved {
            en.key_down(key.clone());
            std::thread::sleep(KEY_GAP);
        }
        for key in resolved.iter().rev() {
            en.key_up(key.clone());
            std::thread::sleep(KEY_GAP);
        }
        Ok(())
    }
}

impl PointerSource for Desktop {
    fn current_position(&self) -> Result<Position> {
        let (x, y) = ENIGO.lock().mouse_location();
        Ok(Position { x, y })
    }
}

/// Map a lowercase key token to an enigo key
///
/// Accepts the names a key-sequence editor produces ("ctrl", "pgup", "del")
/// as well as the longer spellings ("control", "pageup", "delete").
pub fn key_for(token: &str) -> Option<Key> {
    let key = match token {
        "ctrl" | "control" => Key::Control,
        "shift" => Key::Shift,
        "alt" | "option" => Key::Alt,
        "meta" | "win" | "super" | "cmd" | "command" => Key::Meta,
        "return" | "enter" => Key::Return,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "del" | "delete" => Key::Delete,
        "capslock" => Key::CapsLock,
        "home" => Key::Home,
        "end" => Key::End,
        "pgup" | "pageup" => Key::PageUp,
        "pgdown" | "pagedown" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        k => {
            let mut chars = k.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Layout(c),
                _ => return None,
            }
        }
    };
    Some(key)
}
