//! Error types for engram clients
//!
//! Provides error handling for:
//! - Canister calls that fail before a tagged result is produced
//! - Configuration loading and validation

use std::path::PathBuf;

/// Failure of a canister call itself
///
/// Domain rejections are not errors at this level: they arrive as
/// `CanisterResult::Err` inside a successful call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    /// Network or replica failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Reply could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Caller identity was refused
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No actor is bound yet
    #[error("not connected")]
    NotConnected,
}

impl ActorError {
    /// Check if error is likely to clear on its own
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotConnected)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Value out of range or malformed
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
