//! Client configuration
//!
//! Loaded from TOML, overlaid with `ENGRAMX_*` environment variables, then
//! validated. Every field has a default so an empty file is a valid config.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    /// Origin that shareable invite links point at
    pub app_origin: String,
    /// Login provider URL
    pub identity_provider: String,
    /// Maximum lifetime of a login delegation
    pub session_ttl_secs: u64,
    /// Command prefix printed in operator pairing instructions
    pub pair_program: String,
    /// Location of the guardian session store
    pub store_path: Option<PathBuf>,
    /// Invitation timing
    pub invites: InviteTiming,
    /// Logging
    pub log: LogConfig,
}

impl EngramConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid for the schema
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `ENGRAMX_*` environment variables
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup keyed like the environment
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(origin) = lookup("ENGRAMX_ORIGIN") {
            self.app_origin = origin;
        }
        if let Some(provider) = lookup("ENGRAMX_IDENTITY_PROVIDER") {
            self.identity_provider = provider;
        }
        if let Some(path) = lookup("ENGRAMX_STORE_PATH") {
            self.store_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("ENGRAMX_LOG") {
            self.log.level = level;
        }
        self
    }

    /// With app origin
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.app_origin = origin.into();
        self
    }

    /// With invitation timing
    #[inline]
    #[must_use]
    pub fn with_invites(mut self, invites: InviteTiming) -> Self {
        self.invites = invites;
        self
    }

    /// Check ranges and URL shapes
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.app_origin)
            .map_err(|e| ConfigError::Invalid(format!("app_origin: {e}")))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "app_origin: unsupported scheme `{}`",
                origin.scheme()
            )));
        }
        url::Url::parse(&self.identity_provider)
            .map_err(|e| ConfigError::Invalid(format!("identity_provider: {e}")))?;
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid("session_ttl_secs must be positive".into()));
        }
        if self.pair_program.trim().is_empty() {
            return Err(ConfigError::Invalid("pair_program must not be empty".into()));
        }
        self.invites.validate()
    }

    /// Login delegation lifetime in nanoseconds
    #[inline]
    #[must_use]
    pub fn session_ttl_nanos(&self) -> u64 {
        self.session_ttl_secs.saturating_mul(1_000_000_000)
    }

    /// Store path, falling back to the platform data directory
    #[must_use]
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("engramx")
                .join("guardian-engrams.json")
        })
    }
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            app_origin: "http://localhost:5173".to_string(),
            identity_provider: "https://identity.ic0.app".to_string(),
            session_ttl_secs: 4 * 60 * 60,
            pair_program: "npx @engramx/client".to_string(),
            store_path: None,
            invites: InviteTiming::default(),
            log: LogConfig::default(),
        }
    }
}

/// Durations and periods of the invitation engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteTiming {
    /// Guardian invite validity
    pub guardian_ttl_secs: u64,
    /// Operator pairing code validity
    pub operator_ttl_secs: u64,
    /// Guardian acceptance poll period
    pub poll_interval_ms: u64,
    /// Countdown tick period
    pub tick_interval_ms: u64,
}

impl InviteTiming {
    /// Guardian invites live 24h
    pub const GUARDIAN_TTL_SECS: u64 = 86_400;
    /// Operator pairing codes live 5 minutes
    pub const OPERATOR_TTL_SECS: u64 = 300;
    /// Acceptance poll every 5s
    pub const POLL_INTERVAL_MS: u64 = 5_000;
    /// One countdown step per second
    pub const TICK_INTERVAL_MS: u64 = 1_000;

    /// Acceptance poll period
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Countdown tick period
    #[inline]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// With countdown tick period
    #[inline]
    #[must_use]
    pub fn with_tick_interval(mut self, period: Duration) -> Self {
        self.tick_interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With acceptance poll period
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("invites.guardian_ttl_secs", self.guardian_ttl_secs),
            ("invites.operator_ttl_secs", self.operator_ttl_secs),
            ("invites.poll_interval_ms", self.poll_interval_ms),
            ("invites.tick_interval_ms", self.tick_interval_ms),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

impl Default for InviteTiming {
    fn default() -> Self {
        Self {
            guardian_ttl_secs: Self::GUARDIAN_TTL_SECS,
            operator_ttl_secs: Self::OPERATOR_TTL_SECS,
            poll_interval_ms: Self::POLL_INTERVAL_MS,
            tick_interval_ms: Self::TICK_INTERVAL_MS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
