//! Route guard
//!
//! Decides whether a view may render for the current session. This is a
//! capability check only: a present session admits even if the backend would
//! later reject its token.

use crush_common::Route;

use crate::session::Session;

/// Guard decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Render,
    Redirect(Route),
}

impl Admission {
    pub fn is_render(&self) -> bool {
        matches!(self, Admission::Render)
    }
}

/// Admit a guarded view iff the session is present
pub fn admit(session: &Session) -> Admission {
    if session.is_present() {
        Admission::Render
    } else {
        Admission::Redirect(Route::Start)
    }
}

/// Decide navigation to `route`; public routes always render
pub fn navigate(route: Route, session: &Session) -> Admission {
    if route.is_guarded() {
        admit(session)
    } else {
        Admission::Render
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present() -> Session {
        Session::from_parts(Some("tok".into()), Some("a@x.edu".into()))
    }

    #[test]
    fn absent_and_half_sessions_redirect() {
        let half_token = Session::from_parts(Some("tok".into()), None);
        let half_identity = Session::from_parts(None, Some("a@x.edu".into()));

        for session in [Session::Absent, half_token, half_identity] {
            assert_eq!(admit(&session), Admission::Redirect(Route::Start));
        }
    }

    #[test]
    fn present_session_renders() {
        assert_eq!(admit(&present()), Admission::Render);
    }

    #[test]
    fn public_routes_render_without_session() {
        assert!(navigate(Route::Start, &Session::Absent).is_render());
        assert!(navigate(Route::SignUp, &Session::Absent).is_render());
    }

    #[test]
    fn every_guarded_route_checks_session() {
        for route in Route::ALL.iter().copied().filter(Route::is_guarded) {
            assert_eq!(
                navigate(route, &Session::Absent),
                Admission::Redirect(Route::Start),
                "{} rendered without session",
                route
            );
            assert!(navigate(route, &present()).is_render());
        }
    }
}
