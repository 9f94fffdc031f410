//! Application route table with auth gating
//!
//! Maps a navigation target (path plus optional query) to what should
//! happen: render a page, follow a legacy redirect, send the user to login,
//! wait for the session to finish loading, or report an unknown path.

use crate::auth::AuthState;
use std::fmt;
use url::Url;

/// Page of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Dashboard,
    Memory,
    Access,
    Billing,
    System,
    GuardianInvite,
    Guardian,
    Verify,
    Docs,
}

impl Route {
    /// Every page, in table order
    pub const ALL: [Self; 10] = [
        Self::Landing,
        Self::Dashboard,
        Self::Memory,
        Self::Access,
        Self::Billing,
        Self::System,
        Self::GuardianInvite,
        Self::Guardian,
        Self::Verify,
        Self::Docs,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Dashboard => "/dashboard",
            Self::Memory => "/memory",
            Self::Access => "/access",
            Self::Billing => "/billing",
            Self::System => "/system",
            Self::GuardianInvite => "/guardian-invite",
            Self::Guardian => "/guardian",
            Self::Verify => "/verify",
            Self::Docs => "/docs",
        }
    }

    /// Whether the page needs a signed-in user
    ///
    /// The invite landing page stays public so invitees can open it before
    /// signing in.
    #[must_use]
    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            Self::Dashboard
                | Self::Memory
                | Self::Access
                | Self::Billing
                | Self::System
                | Self::Guardian
        )
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Legacy paths and where they moved
pub const REDIRECTS: [(&str, &str); 9] = [
    ("/wallet", "/billing?tab=transfers"),
    ("/cycles", "/billing"),
    ("/updates", "/system"),
    ("/settings", "/memory?tab=backups"),
    ("/sessions", "/memory?tab=sessions"),
    ("/operators", "/access"),
    ("/guardians", "/access?tab=guardians"),
    ("/audit", "/system?tab=audit"),
    ("/backups", "/memory?tab=backups"),
];

/// New location of a legacy path
#[must_use]
pub fn redirect_for(path: &str) -> Option<&'static str> {
    REDIRECTS
        .iter()
        .find(|(from, _)| *from == path)
        .map(|(_, to)| *to)
}

/// Outcome of resolving a navigation target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Show the page
    Render {
        route: Route,
        query: Vec<(String, String)>,
    },
    /// Navigate to another target instead
    Redirect(String),
    /// Sign in first, then continue to `return_to`
    LoginRequired { route: Route, return_to: String },
    /// Session still loading; decide once it settles
    Pending(Route),
    NotFound(String),
}

impl Navigation {
    /// Query value `key` of a rendered page
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        match self {
            Self::Render { query, .. } => query
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

fn parse_target(target: &str) -> Option<Url> {
    let base = Url::parse("http://engramx.local/").ok()?;
    base.join(target).ok()
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Resolve `target` against the route table for the given auth state
///
/// Legacy redirects apply regardless of auth. Protected pages resolve to
/// `Pending` while the session is loading and to `LoginRequired` when
/// nobody is signed in.
#[must_use]
pub fn resolve(target: &str, auth: &AuthState) -> Navigation {
    let Some(url) = parse_target(target) else {
        return Navigation::NotFound(target.to_string());
    };
    let path = normalize(url.path());

    if let Some(to) = redirect_for(path) {
        return Navigation::Redirect(to.to_string());
    }
    let Some(route) = Route::from_path(path) else {
        return Navigation::NotFound(path.to_string());
    };

    if route.requires_auth() && !auth.is_authenticated() {
        if auth.loading {
            return Navigation::Pending(route);
        }
        let return_to = match url.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };
        return Navigation::LoginRequired { route, return_to };
    }

    Navigation::Render {
        route,
        query: url.query_pairs().into_owned().collect(),
    }
}
