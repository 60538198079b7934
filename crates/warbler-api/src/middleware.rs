use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::gate::{self, Denial};
use crate::session::{self, CurrentUser, Session};
use crate::state::{AppState, with_db};

/// Resolve the session cookie to an account once per request and stash the
/// resulting [`Session`] in the request extensions. A token naming an account
/// that no longer exists counts as anonymous.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let session = match session::session_user_id(&jar, &state.session) {
        Some(user_id) => match with_db(&state, move |db| db.get_user_by_id(user_id)).await {
            Ok(Some(user)) => Session::SignedIn(CurrentUser {
                id: user.id,
                username: user.username,
            }),
            Ok(None) => {
                debug!("Session names unknown user {}", user_id);
                Session::Anonymous
            }
            Err(e) => return e.into_response(),
        },
        None => Session::Anonymous,
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}

fn current_session(req: &Request) -> Session {
    req.extensions().get::<Session>().cloned().unwrap_or_default()
}

/// Only signed-in visitors pass. Inserts [`CurrentUser`] for the handler.
pub async fn require_signed_in(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let session = current_session(&req);
    match gate::signed_in(&session) {
        Ok(user) => {
            req.extensions_mut().insert(user.clone());
            next.run(req).await
        }
        Err(denial) => denial.respond(jar, &state.session),
    }
}

/// Only anonymous visitors pass.
pub async fn require_signed_out(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    match gate::signed_out(&current_session(&req)) {
        Ok(()) => next.run(req).await,
        Err(denial) => denial.respond(jar, &state.session),
    }
}

/// Only the account named by the `{username}` path segment passes.
/// Inserts [`CurrentUser`] for the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(expected) = params.get("username") else {
        return Denial::Unauthorized.respond(jar, &state.session);
    };

    let session = current_session(&req);
    match gate::identity(&session, expected) {
        Ok(user) => {
            req.extensions_mut().insert(user.clone());
            next.run(req).await
        }
        Err(denial) => denial.respond(jar, &state.session),
    }
}
