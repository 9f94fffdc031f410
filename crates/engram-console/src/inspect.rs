//! Route and invite link inspection

use engram_core::{Identity, Principal};
use engram_invite::{GuardianInviteLink, LinkError};
use engram_session::{resolve, AuthState, Navigation};

fn describe(nav: &Navigation) -> String {
    match nav {
        Navigation::Render { route, query } if query.is_empty() => format!("render {route}"),
        Navigation::Render { route, query } => {
            let params: Vec<String> = query
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            format!("render {route} ({})", params.join(", "))
        }
        Navigation::Redirect(to) => format!("redirect -> {to}"),
        Navigation::LoginRequired { route, return_to } => {
            format!("login required for {route}, then return to {return_to}")
        }
        Navigation::Pending(route) => format!("pending {route} until the session loads"),
        Navigation::NotFound(path) => format!("not found: {path}"),
    }
}

/// Describe where `target` leads, following one legacy redirect
#[must_use]
pub fn route(target: &str, signed_in: bool) -> String {
    let auth = if signed_in {
        AuthState::signed_in(Identity::new(Principal::anonymous()))
    } else {
        AuthState::signed_out()
    };

    let nav = resolve(target, &auth);
    match &nav {
        Navigation::Redirect(to) => {
            format!("{}\n{}", describe(&nav), describe(&resolve(to, &auth)))
        }
        _ => describe(&nav),
    }
}

/// Describe the engram and code carried by an invite link
///
/// # Errors
/// Returns `LinkError` if `text` is not a guardian invite link.
pub fn link(text: &str) -> Result<String, LinkError> {
    let link = GuardianInviteLink::parse(text)?;
    Ok(format!("engram: {}\ncode:   {}", link.engram, link.code))
}
