//! engram invite - invitation lifecycle engine
//!
//! Manages the two kinds of time-limited invitation codes an engram owner
//! can issue:
//! - Guardian invites: 24h validity, acceptance detected by polling
//! - Operator pairing codes: 5 minute validity, default permission bundle
//!
//! Both engines keep their state in a `tokio::sync::watch` channel, run at
//! most one countdown (and, for guardians, one poll) at a time, and cancel
//! every timer when dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use engram_invite::{GuardianInvite, MemoryClipboard};
//!
//! # async fn example(actor: engram_core::SharedActor, canister: engram_core::CanisterId) {
//! let invite = GuardianInvite::new(
//!     engram_core::connected(actor),
//!     canister,
//!     url::Url::parse("https://app.engramx.io").unwrap(),
//!     std::sync::Arc::new(MemoryClipboard::new()),
//! );
//! invite.create_invite("alice", engram_core::GuardianPermissions::all()).await;
//! println!("{} left", invite.countdown_text());
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clipboard;
pub mod countdown;
pub mod error;
pub mod guardian;
pub mod kind;
pub mod link;
pub mod operator;
mod progress;

pub use clipboard::{Clipboard, MemoryClipboard};
pub use countdown::{Countdown, CountdownFormat};
pub use error::{ClipboardError, InviteError, LinkError};
pub use guardian::{GuardianInvite, GuardianInviteState, GuardianSnapshot};
pub use kind::InviteKind;
pub use link::{pair_command, GuardianInviteLink, GUARDIAN_INVITE_PATH};
pub use operator::{OperatorInvite, OperatorInviteState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with invitation engines
    pub use crate::{
        Clipboard, GuardianInvite, GuardianInviteState, InviteKind, MemoryClipboard,
        OperatorInvite, OperatorInviteState,
    };
}
