use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use warbler_types::api::NoticeCategory;

use crate::error::ApiError;
use crate::flash::flash;
use crate::session::CurrentUser;
use crate::state::{AppState, with_db};
use crate::view::redirect;

enum LikeOutcome {
    Missing,
    OwnMessage,
    Done(bool),
}

/// POST /users/add_like/{message_id}
pub async fn add_like(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    jar: CookieJar,
    Path(message_id): Path<i64>,
) -> Result<Response, ApiError> {
    let my_id = me.id;
    let outcome = with_db(&state, move |db| {
        let Some(message) = db.get_message(message_id)? else {
            return Ok(LikeOutcome::Missing);
        };
        if message.user_id == my_id {
            return Ok(LikeOutcome::OwnMessage);
        }
        db.add_like(my_id, message_id).map(LikeOutcome::Done)
    })
    .await?;

    match outcome {
        LikeOutcome::Missing => Err(ApiError::NotFound("Message not found")),
        LikeOutcome::OwnMessage => {
            let jar = flash(jar, &state.session, NoticeCategory::Warning, "You cannot like your own message.");
            Ok((jar, redirect("/")).into_response())
        }
        LikeOutcome::Done(added) => {
            if added {
                info!("User {} liked message {}", my_id, message_id);
            }
            Ok(redirect("/"))
        }
    }
}

/// POST /users/remove_like/{message_id}
pub async fn remove_like(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(message_id): Path<i64>,
) -> Result<Response, ApiError> {
    let my_id = me.id;
    let removed = with_db(&state, move |db| {
        if db.get_message(message_id)?.is_none() {
            return Ok(None);
        }
        db.remove_like(my_id, message_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Message not found"))?;

    if removed {
        info!("User {} unliked message {}", my_id, message_id);
    }
    Ok(redirect("/"))
}
