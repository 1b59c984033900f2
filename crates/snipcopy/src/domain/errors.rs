//! Domain-specific errors.

use thiserror::Error;

/// The clipboard refused or could not perform a write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard write denied: {0}")]
    Denied(String),
    #[error("no clipboard backend available")]
    Unavailable,
}

/// A rule selector could not be compiled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid selector '{selector}': {reason}")]
    Invalid { selector: String, reason: String },
}

/// An inbound command message that cannot be routed. Never shown to the user.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("command message has no action")]
    MissingAction,
    #[error("unknown action '{0}'")]
    UnknownAction(String),
}
