//! Error types for the invitation engines
//!
//! Creation failures are not errors here: they are stored as display strings
//! in the engine state. These types cover the side channels (clipboard,
//! links, construction).

use engram_core::InvalidId;

/// Clipboard write failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    /// No clipboard is reachable from this context
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    /// The platform refused the write
    #[error("clipboard write denied: {0}")]
    Denied(String),
}

/// Invitation engine errors
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    /// Copy to clipboard failed
    #[error("copy failed: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Configured origin cannot host invite links
    #[error("invalid app origin `{origin}`: {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

/// Guardian invite link decoding errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Not a URL
    #[error("malformed link: {0}")]
    Malformed(#[from] url::ParseError),

    /// URL does not point at the invite page
    #[error("not a guardian invite link: unexpected path `{0}`")]
    WrongPath(String),

    /// Required query parameter absent or empty
    #[error("guardian invite link is missing `{0}`")]
    MissingParam(&'static str),

    /// `engram` parameter is not a canister id
    #[error("invalid engram in link: {0}")]
    InvalidEngram(#[from] InvalidId),
}
