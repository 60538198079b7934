//! Session gate: the authorization checks guarding routes.
//!
//! Each guard inspects the request's [`Session`] and either passes or yields
//! a [`Denial`]. A denial is never a hard error: it becomes a flash notice and
//! a redirect. The guards are wired to routes in `middleware`.

use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use warbler_types::api::NoticeCategory;

use crate::flash::flash;
use crate::session::{CurrentUser, Session, SessionConfig};
use crate::view::redirect;

pub const UNAUTHORIZED_NOTICE: &str = "Access unauthorized.";
pub const ALREADY_SIGNED_IN_NOTICE: &str = "You are already logged in!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No identity, or the wrong one.
    Unauthorized,
    /// A signed-in visitor hit a signed-out-only route.
    AlreadySignedIn { user_id: i64 },
}

impl Denial {
    pub fn location(&self) -> String {
        match self {
            Denial::Unauthorized => "/".to_string(),
            Denial::AlreadySignedIn { user_id } => format!("/users/{}", user_id),
        }
    }

    pub fn notice(&self) -> (NoticeCategory, &'static str) {
        match self {
            Denial::Unauthorized => (NoticeCategory::Danger, UNAUTHORIZED_NOTICE),
            Denial::AlreadySignedIn { .. } => (NoticeCategory::Warning, ALREADY_SIGNED_IN_NOTICE),
        }
    }

    /// Flash the notice and redirect, keeping any notices already queued in `jar`.
    pub fn respond(self, jar: CookieJar, config: &SessionConfig) -> Response {
        debug!(denial = ?self, "Session gate rejected request");
        let (category, message) = self.notice();
        (flash(jar, config, category, message), redirect(&self.location())).into_response()
    }
}

pub fn signed_in(session: &Session) -> Result<&CurrentUser, Denial> {
    session.user().ok_or(Denial::Unauthorized)
}

pub fn signed_out(session: &Session) -> Result<(), Denial> {
    match session.user() {
        Some(user) => Err(Denial::AlreadySignedIn { user_id: user.id }),
        None => Ok(()),
    }
}

/// Pass only if the session belongs to `expected_username`.
pub fn identity<'a>(session: &'a Session, expected_username: &str) -> Result<&'a CurrentUser, Denial> {
    match session.user() {
        Some(user) if user.username == expected_username => Ok(user),
        _ => Err(Denial::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    fn alice() -> Session {
        Session::SignedIn(CurrentUser {
            id: 3,
            username: "alice".into(),
        })
    }

    #[test]
    fn signed_in_requires_identity() {
        assert_eq!(signed_in(&Session::Anonymous), Err(Denial::Unauthorized));
        assert_eq!(signed_in(&alice()).unwrap().id, 3);
    }

    #[test]
    fn signed_out_rejects_identity() {
        assert_eq!(signed_out(&Session::Anonymous), Ok(()));
        assert_eq!(signed_out(&alice()), Err(Denial::AlreadySignedIn { user_id: 3 }));
    }

    #[test]
    fn identity_must_match_username() {
        assert!(identity(&alice(), "alice").is_ok());
        assert_eq!(identity(&alice(), "bob"), Err(Denial::Unauthorized));
        assert_eq!(identity(&Session::Anonymous, "alice"), Err(Denial::Unauthorized));
        assert_eq!(identity(&Session::Anonymous, ""), Err(Denial::Unauthorized));
    }

    #[test]
    fn unauthorized_redirects_home() {
        let config = SessionConfig {
            secret: "test-secret".into(),
            ttl_hours: 1,
            secure_cookies: false,
        };
        let response = Denial::Unauthorized.respond(CookieJar::new(), &config);
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[test]
    fn already_signed_in_redirects_to_profile() {
        let denial = Denial::AlreadySignedIn { user_id: 3 };
        assert_eq!(denial.location(), "/users/3");
        assert_eq!(denial.notice(), (NoticeCategory::Warning, ALREADY_SIGNED_IN_NOTICE));
    }
}
