//! Invitation kinds and their per-kind policy

use crate::countdown::CountdownFormat;
use engram_core::InviteTiming;
use std::fmt;

/// Kind of invitation an engram owner can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InviteKind {
    /// Guardian invite, redeemed through the invite link
    Guardian,
    /// Operator pairing code, redeemed by the operator CLI
    Operator,
}

impl InviteKind {
    /// Validity of a fresh code
    #[must_use]
    pub fn ttl_secs(self, timing: &InviteTiming) -> u64 {
        match self {
            Self::Guardian => timing.guardian_ttl_secs,
            Self::Operator => timing.operator_ttl_secs,
        }
    }

    /// How the remaining validity is rendered
    #[must_use]
    pub fn countdown_format(self) -> CountdownFormat {
        match self {
            Self::Guardian => CountdownFormat::HoursMinutes,
            Self::Operator => CountdownFormat::MinutesSeconds,
        }
    }

    /// Lowercase name, as used on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guardian => "guardian",
            Self::Operator => "operator",
        }
    }
}

impl fmt::Display for InviteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
