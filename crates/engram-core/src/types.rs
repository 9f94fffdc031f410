//! Core types for engram clients
//!
//! Defines the fundamental values exchanged with the canisters:
//! - Textual principals and canister identifiers
//! - Resolved identities
//! - Guardian and operator permission payloads
//! - Guardian listings and registry records
//! - Tagged canister results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a textual identifier is malformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} `{value}`: {reason}")]
pub struct InvalidId {
    /// Identifier kind ("principal" or "canister id")
    pub kind: &'static str,
    /// Rejected input
    pub value: String,
    /// Why it was rejected
    pub reason: &'static str,
}

fn validate_textual(kind: &'static str, value: &str) -> Result<(), InvalidId> {
    let reject = |reason| InvalidId {
        kind,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(reject("empty"));
    }
    if value.starts_with('-') || value.ends_with('-') || value.contains("--") {
        return Err(reject("misplaced separator"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(reject("expected lowercase base32 groups separated by '-'"));
    }
    Ok(())
}

/// Textual principal of a user, guardian or operator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// The anonymous principal
    pub const ANONYMOUS: &'static str = "2vxsx-fae";

    /// Parse a principal from its textual form
    ///
    /// # Errors
    /// Returns `InvalidId` if the text is not a well-formed principal
    pub fn parse(text: &str) -> Result<Self, InvalidId> {
        validate_textual("principal", text)?;
        Ok(Self(text.to_string()))
    }

    /// The anonymous principal
    #[must_use]
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    /// Textual form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the anonymous principal
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }
}

impl FromStr for Principal {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = InvalidId;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        validate_textual("principal", &text)?;
        Ok(Self(text))
    }
}

impl From<Principal> for String {
    fn from(id: Principal) -> Self {
        id.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a deployed canister (an engram instance or the registry)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanisterId(String);

impl CanisterId {
    /// Parse a canister identifier from its textual form
    ///
    /// # Errors
    /// Returns `InvalidId` if the text is not a well-formed identifier
    pub fn parse(text: &str) -> Result<Self, InvalidId> {
        validate_textual("canister id", text)?;
        Ok(Self(text.to_string()))
    }

    /// Textual form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CanisterId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CanisterId {
    type Error = InvalidId;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        validate_textual("canister id", &text)?;
        Ok(Self(text))
    }
}

impl From<CanisterId> for String {
    fn from(id: CanisterId) -> Self {
        id.0
    }
}

impl fmt::Display for CanisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity resolved through the login flow
///
/// Authorizes every canister call made on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    principal: Principal,
    /// Delegation expiry, nanoseconds since the epoch
    expires_at_nanos: Option<u64>,
}

impl Identity {
    /// Create identity for a principal
    #[inline]
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            expires_at_nanos: None,
        }
    }

    /// With delegation expiry
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expires_at_nanos: u64) -> Self {
        self.expires_at_nanos = Some(expires_at_nanos);
        self
    }

    /// Principal of this identity
    #[inline]
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Delegation expiry, if any
    #[inline]
    #[must_use]
    pub fn expires_at_nanos(&self) -> Option<u64> {
        self.expires_at_nanos
    }
}

/// Capabilities granted to a guardian, chosen by the engram owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianPermissions {
    pub can_revoke_operators: bool,
    pub can_freeze_payments: bool,
    pub can_pause_writes: bool,
}

impl GuardianPermissions {
    /// Every guardian capability
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self {
            can_revoke_operators: true,
            can_freeze_payments: true,
            can_pause_writes: true,
        }
    }
}

/// Permission bundle attached to an operator invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPermissions {
    pub can_read_memory: bool,
    pub can_append_memory: bool,
    pub can_read_sessions: bool,
    pub can_append_sessions: bool,
    pub can_search_memory: bool,
    pub can_read_config: bool,
    pub can_read_wallet: bool,
    pub can_transfer_funds: bool,
    pub daily_spending_limit_e8s: u64,
    pub allowlisted_addresses: Vec<String>,
    pub calls_per_minute: u64,
    #[serde(rename = "maxSessionTTLNanos")]
    pub max_session_ttl_nanos: u64,
}

impl OperatorPermissions {
    /// Calls per minute granted by the default bundle
    pub const DEFAULT_CALLS_PER_MINUTE: u64 = 120;

    /// Session lifetime granted by the default bundle (24h)
    pub const DEFAULT_SESSION_TTL_NANOS: u64 = 86_400_000_000_000;

    /// The fixed bundle sent with every operator invite
    ///
    /// Read and append access to memory and sessions, search, read-only
    /// config and wallet, no transfers.
    #[must_use]
    pub fn default_bundle() -> Self {
        Self {
            can_read_memory: true,
            can_append_memory: true,
            can_read_sessions: true,
            can_append_sessions: true,
            can_search_memory: true,
            can_read_config: true,
            can_read_wallet: true,
            can_transfer_funds: false,
            daily_spending_limit_e8s: 0,
            allowlisted_addresses: Vec::new(),
            calls_per_minute: Self::DEFAULT_CALLS_PER_MINUTE,
            max_session_ttl_nanos: Self::DEFAULT_SESSION_TTL_NANOS,
        }
    }
}

impl Default for OperatorPermissions {
    fn default() -> Self {
        Self::default_bundle()
    }
}

/// Lifecycle status of a guardian entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardianStatus {
    /// Invite accepted, awaiting owner confirmation
    Pending,
    /// Confirmed guardian
    Active,
    /// Removed by the owner
    Revoked,
}

/// One row of `list_guardians`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianEntry {
    pub principal: Principal,
    pub status: GuardianStatus,
}

impl GuardianEntry {
    /// Create guardian entry
    #[inline]
    #[must_use]
    pub fn new(principal: Principal, status: GuardianStatus) -> Self {
        Self { principal, status }
    }

    /// Whether the entry awaits confirmation
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == GuardianStatus::Pending
    }
}

/// Engram owned by the caller, as reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngramRecord {
    pub canister_id: CanisterId,
    pub owner: Principal,
    pub created_at_nanos: u64,
}

/// Two-case result returned by canister methods
///
/// Serialized externally tagged (`{"Ok": ..}` / `{"Err": ".."}`), the shape
/// the canister variants use on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanisterResult<T> {
    /// Call succeeded
    Ok(T),
    /// Call rejected by the canister, with its message
    Err(String),
}

impl<T> CanisterResult<T> {
    /// Convert into a standard `Result`
    #[inline]
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Err(message) => Err(message),
        }
    }

    /// Whether the call succeeded
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl<T> From<Result<T, String>> for CanisterResult<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(message) => Self::Err(message),
        }
    }
}
