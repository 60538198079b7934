//! JSON stand-ins for rendered pages, plus the redirect helper.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use warbler_db::models::{MessageRow, UserRow};
use warbler_types::api::Page;
use warbler_types::models::{Message, User};

use crate::flash;

/// Most messages shown on a timeline or profile.
pub const PAGE_LIMIT: u32 = 100;

/// `302 Found`, as form posts expect.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

/// Render a page document along with (and consuming) pending flash notices.
pub fn render<T: Serialize>(jar: CookieJar, body: T) -> Response {
    let (jar, flashes) = flash::take(jar);
    (jar, Json(Page { flashes, body })).into_response()
}

pub fn user_view(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
        image_url: row.image_url,
        header_image_url: row.header_image_url,
        bio: row.bio,
        location: row.location,
    }
}

pub fn message_view(row: MessageRow) -> Message {
    Message {
        id: row.id,
        text: row.text,
        timestamp: row.timestamp,
        user_id: row.user_id,
        username: row.username,
        image_url: row.image_url,
    }
}

pub fn user_views(rows: Vec<UserRow>) -> Vec<User> {
    rows.into_iter().map(user_view).collect()
}

pub fn message_views(rows: Vec<MessageRow>) -> Vec<Message> {
    rows.into_iter().map(message_view).collect()
}
