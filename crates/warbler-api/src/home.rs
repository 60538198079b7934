use axum::{
    Extension,
    extract::State,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use warbler_types::api::HomePage;

use crate::error::ApiError;
use crate::session::Session;
use crate::state::{AppState, with_db};
use crate::view::{PAGE_LIMIT, message_views, render, user_view};

/// GET /: the signed-in user's timeline, or an empty landing page.
pub async fn homepage(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let Some(me) = session.user().map(|u| u.id) else {
        return Ok(render(jar, HomePage::default()));
    };

    let page = with_db(&state, move |db| {
        let user = db.get_user_by_id(me)?;
        let messages = db.timeline(me, PAGE_LIMIT)?;
        let likes = db
            .liked_message_ids(me)?
            .into_iter()
            .filter(|id| messages.iter().any(|m| m.id == *id))
            .collect();
        Ok(HomePage {
            user: user.map(user_view),
            messages: message_views(messages),
            likes,
        })
    })
    .await?;

    Ok(render(jar, page))
}
