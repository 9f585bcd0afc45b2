//! Authorization gate - decides whether a navigation may proceed

use serde::Serialize;

use crate::domain::Route;

use super::session::SessionStore;

/// Outcome of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    /// Go to `target` first; `from` is where to resume after signing in
    Redirect { target: Route, from: Route },
}

impl Decision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Decision::Proceed)
    }

    /// Route to continue to once the user has signed in
    pub fn resume_target(&self) -> Option<Route> {
        match self {
            Decision::Proceed => None,
            Decision::Redirect { from, .. } => Some(*from),
        }
    }
}

/// Pure gate rule
///
/// A destination that requires authentication redirects to the login page
/// when there is no session; everything else proceeds.
pub fn authorize(requires_auth: bool, is_authenticated: bool, requested: Route) -> Decision {
    if requires_auth && !is_authenticated {
        Decision::Redirect {
            target: Route::Login,
            from: requested,
        }
    } else {
        Decision::Proceed
    }
}

/// Gate bound to the application session
#[derive(Clone)]
pub struct AuthorizationGate {
    session: SessionStore,
}

impl AuthorizationGate {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    pub fn check(&self, route: Route) -> Decision {
        let decision = authorize(route.requires_auth(), self.session.is_authenticated(), route);
        if let Decision::Redirect { from, .. } = decision {
            tracing::debug!(route = %from, "navigation redirected to login");
        }
        decision
    }
}
