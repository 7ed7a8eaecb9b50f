//! Macro actions - one click or key chord plus the delay that follows it
//!
//! Serialized as the flat records the macro file holds:
//! `{"type":"mouse","x":10,"y":20,"delay":1}` and
//! `{"type":"keyboard","keys":["ctrl","c"],"delay":1}`.

use anytime_core::{Error, PointerSource, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Single playback step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", try_from = "ActionRecord")]
pub enum Action {
    /// Left click at screen coordinates
    #[serde(rename = "mouse")]
    MouseClick {
        x: i32,
        y: i32,
        #[serde(rename = "delay")]
        delay_seconds: u64,
    },

    /// Keys pressed together, in press order
    #[serde(rename = "keyboard")]
    KeyCombo {
        keys: Vec<String>,
        #[serde(rename = "delay")]
        delay_seconds: u64,
    },
}

/// Wire shape of an action before validation
#[derive(Deserialize)]
#[serde(tag = "type")]
enum ActionRecord {
    #[serde(rename = "mouse")]
    MouseClick { x: i32, y: i32, delay: u64 },
    #[serde(rename = "keyboard")]
    KeyCombo { keys: Vec<String>, delay: u64 },
}

impl TryFrom<ActionRecord> for Action {
    type Error = Error;

    fn try_from(record: ActionRecord) -> Result<Self> {
        let action = match record {
            ActionRecord::MouseClick { x, y, delay } => Self::MouseClick {
                x,
                y,
                delay_seconds: delay,
            },
            ActionRecord::KeyCombo { keys, delay } => Self::KeyCombo {
                keys,
                delay_seconds: delay,
            },
        };
        action.validate()?;
        Ok(action)
    }
}

impl Action {
    pub fn mouse_click(x: i32, y: i32, delay: Delay) -> Self {
        Self::MouseClick {
            x,
            y,
            delay_seconds: delay.total_seconds(),
        }
    }

    pub fn key_combo<I, S>(keys: I, delay: Delay) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let action = Self::KeyCombo {
            keys: keys.into_iter().map(Into::into).collect(),
            delay_seconds: delay.total_seconds(),
        };
        action.validate()?;
        Ok(action)
    }

    /// Click at wherever the pointer is right now
    pub fn capture_mouse(pointer: &dyn PointerSource, delay: Delay) -> Result<Self> {
        let pos = pointer.current_position()?;
        Ok(Self::mouse_click(pos.x, pos.y, delay))
    }

    /// Chord from an entered key sequence such as "Ctrl+Shift+A"
    pub fn capture_keys(sequence: &str, delay: Delay) -> Result<Self> {
        Self::key_combo(parse_chord(sequence)?, delay)
    }

    pub fn delay(&self) -> Delay {
        match self {
            Self::MouseClick { delay_seconds, .. } | Self::KeyCombo { delay_seconds, .. } => {
                Delay::from_secs(*delay_seconds)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::MouseClick { .. } => Ok(()),
            Self::KeyCombo { keys, .. } => {
                if keys.is_empty() {
                    return Err(Error::invalid_action("Key combination has no keys"));
                }
                for key in keys {
                    validate_key_token(key)?;
                }
                Ok(())
            }
        }
    }

    /// List label, also the identity used when reordering
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MouseClick { x, y, .. } => {
                write!(f, "Mouse click at ({}, {}) - delay: {}", x, y, self.delay())
            }
            Self::KeyCombo { keys, .. } => {
                write!(f, "Key input: {} - delay: {}", keys.join(" + "), self.delay())
            }
        }
    }
}

/// Post-action delay in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Delay(u64);

impl Delay {
    pub const fn from_secs(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Saturates at `u64::MAX` seconds
    pub const fn from_hms(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self(
            hours
                .saturating_mul(3600)
                .saturating_add(minutes.saturating_mul(60))
                .saturating_add(seconds),
        )
    }

    pub const fn total_seconds(&self) -> u64 {
        self.0
    }

    pub const fn hours(&self) -> u64 {
        self.0 / 3600
    }

    pub const fn minutes(&self) -> u64 {
        (self.0 % 3600) / 60
    }

    pub const fn seconds(&self) -> u64 {
        self.0 % 60
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours(), self.minutes(), self.seconds())
    }
}

/// Split an entered key sequence into lowercase chord tokens
pub fn parse_chord(sequence: &str) -> Result<Vec<String>> {
    if sequence.trim().is_empty() {
        return Err(Error::invalid_action("Enter a valid key sequence"));
    }
    let keys: Vec<String> = sequence
        .to_lowercase()
        .split('+')
        .map(|k| k.trim().to_string())
        .collect();
    for key in &keys {
        validate_key_token(key)?;
    }
    Ok(keys)
}

fn validate_key_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::invalid_action("Key combination contains an empty key"));
    }
    if token.chars().any(char::is_whitespace) || token.chars().any(char::is_uppercase) {
        return Err(Error::invalid_action(format!(
            "Key '{}' must be a lowercase name without spaces",
            token
        )));
    }
    Ok(())
}
