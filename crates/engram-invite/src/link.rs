//! Shareable invite artifacts
//!
//! Guardian invites travel as a link to the `/guardian-invite` page of the
//! app; operator invites as a CLI pairing command.

use crate::error::LinkError;
use engram_core::CanisterId;
use url::Url;

/// Path of the page that redeems guardian invites
pub const GUARDIAN_INVITE_PATH: &str = "/guardian-invite";

/// Target engram and code carried by a guardian invite link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianInviteLink {
    pub engram: CanisterId,
    pub code: String,
}

impl GuardianInviteLink {
    /// Create link payload
    #[inline]
    #[must_use]
    pub fn new(engram: CanisterId, code: impl Into<String>) -> Self {
        Self {
            engram,
            code: code.into(),
        }
    }

    /// Link on `origin`
    ///
    /// Any path or query already on `origin` is replaced.
    #[must_use]
    pub fn to_url(&self, origin: &Url) -> Url {
        let mut url = origin.clone();
        url.set_path(GUARDIAN_INVITE_PATH);
        url.set_query(None);
        url.set_fragment(None);
        url.query_pairs_mut()
            .append_pair("engram", self.engram.as_str())
            .append_pair("code", &self.code);
        url
    }

    /// Decode a link produced by `to_url`
    ///
    /// # Errors
    /// Returns `LinkError` if the text is not a URL, points elsewhere, or
    /// lacks a valid `engram` or non-empty `code` parameter.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let url = Url::parse(link)?;
        if url.path() != GUARDIAN_INVITE_PATH {
            return Err(LinkError::WrongPath(url.path().to_string()));
        }

        let param = |name: &'static str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
                .ok_or(LinkError::MissingParam(name))
        };

        let engram = CanisterId::parse(&param("engram")?)?;
        let code = param("code")?;
        Ok(Self { engram, code })
    }
}

/// Command that pairs an operator client using `code`
#[must_use]
pub fn pair_command(program: &str, code: &str, engram: &CanisterId) -> String {
    format!("{program} pair {code} --engram {engram}")
}
