//! Navigable route table
//!
//! Public routes are reachable without a session. Every other route is
//! guarded and only rendered when a complete session is present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A navigable view of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Unauthenticated entry point (`/`)
    Start,
    /// Onboarding for new or inactive identities (`/signup`)
    SignUp,
    /// Landing page after login (`/home`)
    Home,
    /// Own profile editor (`/user`)
    User,
    /// Weekly match selection (`/pick-matches`)
    PickMatches,
    /// Matches from previous weeks (`/old-matches`)
    OldMatches,
    /// Profile search (`/search`)
    Search,
}

impl Route {
    /// All routes in navigation order
    pub const ALL: [Route; 7] = [
        Route::Start,
        Route::SignUp,
        Route::Home,
        Route::User,
        Route::PickMatches,
        Route::OldMatches,
        Route::Search,
    ];

    /// URL path of the route
    pub fn path(&self) -> &'static str {
        match self {
            Route::Start => "/",
            Route::SignUp => "/signup",
            Route::Home => "/home",
            Route::User => "/user",
            Route::PickMatches => "/pick-matches",
            Route::OldMatches => "/old-matches",
            Route::Search => "/search",
        }
    }

    /// Resolve a path to a route
    ///
    /// A single trailing slash is ignored. Unknown paths yield `None`.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        };
        Route::ALL.into_iter().find(|r| r.path() == trimmed)
    }

    /// Whether navigating here requires a session
    pub fn is_guarded(&self) -> bool {
        !matches!(self, Route::Start | Route::SignUp)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
