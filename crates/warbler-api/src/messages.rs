use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_types::api::{FormPage, MessageForm, MessagePage, NoticeCategory};

use crate::error::ApiError;
use crate::flash::flash;
use crate::gate;
use crate::session::{CurrentUser, Session};
use crate::state::{AppState, with_db};
use crate::view::{message_view, redirect, render};

pub const MAX_MESSAGE_LEN: usize = 140;

/// Trim and length-check a new message's text.
pub fn validate_text(text: &str) -> Result<&str, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty.".into()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation(format!(
            "Message cannot be longer than {} characters.",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(text)
}

pub async fn new_message_page(jar: CookieJar) -> Response {
    render(jar, FormPage {
        form: "message",
        fields: &["text"],
    })
}

/// POST /messages/new
pub async fn create_message(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<MessageForm>,
) -> Result<Response, ApiError> {
    let text = match validate_text(&form.text) {
        Ok(text) => text.to_string(),
        Err(ApiError::Validation(msg)) => {
            return Ok((flash(jar, &state.session, NoticeCategory::Danger, msg), redirect("/messages/new")).into_response());
        }
        Err(e) => return Err(e),
    };

    let my_id = me.id;
    let message = with_db(&state, move |db| db.insert_message(my_id, &text)).await?;
    info!("User {} posted message {}", my_id, message.id);

    Ok(redirect(&format!("/users/{}", my_id)))
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(message_id): Path<i64>,
) -> Result<Response, ApiError> {
    let page = with_db(&state, move |db| {
        let Some(message) = db.get_message(message_id)? else {
            return Ok(None);
        };
        Ok(Some(MessagePage {
            likes: db.like_count(message_id)?,
            message: message_view(message),
        }))
    })
    .await?
    .ok_or(ApiError::NotFound("Message not found"))?;

    Ok(render(jar, page))
}

/// POST /messages/{message_id}/delete. Only the author may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Path(message_id): Path<i64>,
) -> Result<Response, ApiError> {
    let message = with_db(&state, move |db| db.get_message(message_id))
        .await?
        .ok_or(ApiError::NotFound("Message not found"))?;

    let me = match gate::identity(&session, &message.username) {
        Ok(me) => me.id,
        Err(denial) => {
            warn!("Refused to delete message {} owned by {}", message_id, message.username);
            return Ok(denial.respond(jar, &state.session));
        }
    };

    with_db(&state, move |db| db.delete_message(message_id)).await?;
    info!("User {} deleted message {}", me, message_id);

    Ok(redirect(&format!("/users/{}", me)))
}
