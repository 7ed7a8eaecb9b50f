//! Structured errors, reported to the caller instead of crashing the process

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code:?}] {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyRunning,
    EmptyMacro,
    IndexOutOfRange,
    MalformedData,
    InvalidSchedule,
    InvalidAction,
    InjectionFailure,
    UnknownKey,
    Io,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn already_running() -> Self {
        Self::new(ErrorCode::AlreadyRunning, "A macro is already running")
            .with_suggestions(vec!["Stop the running macro before starting another".into()])
    }

    pub fn empty_macro() -> Self {
        Self::new(ErrorCode::EmptyMacro, "There are no macro actions to run")
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::new(
            ErrorCode::IndexOutOfRange,
            format!("Index {} is out of range for {} actions", index, len),
        )
        .with_context(serde_json::json!({ "index": index, "len": len }))
    }

    pub fn malformed_data(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedData, reason)
    }

    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSchedule, reason)
            .with_suggestions(vec!["Choose a time in the future".into()])
    }

    pub fn invalid_action(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAction, reason)
    }

    pub fn injection_failure(action: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::InjectionFailure,
            format!("{} failed: {}", action, reason),
        )
    }

    pub fn unknown_key(token: &str) -> Self {
        Self::new(ErrorCode::UnknownKey, format!("Unknown key: {}", token))
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::MalformedData, e.to_string())
    }
}
