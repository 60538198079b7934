use serde::{Deserialize, Serialize};

use crate::models::{Message, User, UserStats};

// -- Forms --

/// Sign-up form. Every field is optional at the wire level so a missing one
/// is reported as a validation failure rather than a rejected request.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub text: String,
}

/// Profile edit form. `password` is the current password, required to
/// confirm the change.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub header_image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// -- Flash notices --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeCategory {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub category: NoticeCategory,
    pub message: String,
}

// -- Page documents --

/// Every rendered page carries the flash notices pending for the visitor.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub flashes: Vec<Notice>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Default, Serialize)]
pub struct HomePage {
    pub user: Option<User>,
    pub messages: Vec<Message>,
    /// Ids of the messages in `messages` the viewer has liked.
    pub likes: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserListPage {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub user: User,
    pub stats: UserStats,
    pub messages: Vec<Message>,
    /// Present only for signed-in viewers looking at someone else.
    pub viewer_is_following: Option<bool>,
    pub viewer_is_followed_by: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct FollowPage {
    pub user: User,
    pub stats: UserStats,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct LikesPage {
    pub user: User,
    pub stats: UserStats,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub message: Message,
    pub likes: u64,
}

#[derive(Debug, Serialize)]
pub struct EditProfilePage {
    pub user: User,
    pub email: String,
}

/// Describes a form for the client to render.
#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: &'static str,
    pub fields: &'static [&'static str],
}
