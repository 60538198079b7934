use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_db::models::ProfileChanges;
use warbler_types::api::{
    EditProfilePage, FollowPage, LikesPage, NoticeCategory, ProfileForm, ProfilePage, SearchQuery,
    UserListPage,
};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::flash::flash;
use crate::session::{self, CurrentUser, Session};
use crate::state::{AppState, with_db};
use crate::view::{PAGE_LIMIT, message_views, redirect, render, user_view, user_views};

/// GET /users, optionally filtered by `?q=`.
pub async fn list_users(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let needle = query.q.filter(|q| !q.trim().is_empty());
    let users = with_db(&state, move |db| db.search_users(needle.as_deref())).await?;
    Ok(render(jar, UserListPage {
        users: user_views(users),
    }))
}

/// GET /users/{user_id}
pub async fn show_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let viewer = session.user().map(|u| u.id).filter(|&id| id != user_id);

    let page = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        let (viewer_is_following, viewer_is_followed_by) = match viewer {
            Some(viewer) => (
                Some(db.is_following(viewer, user_id)?),
                Some(db.is_followed_by(viewer, user_id)?),
            ),
            None => (None, None),
        };
        Ok(Some(ProfilePage {
            user: user_view(user),
            stats: db.user_stats(user_id)?,
            messages: message_views(db.messages_by_user(user_id, PAGE_LIMIT)?),
            viewer_is_following,
            viewer_is_followed_by,
        }))
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    Ok(render(jar, page))
}

/// GET /users/{user_id}/following
pub async fn show_following(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let page = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        Ok(Some(FollowPage {
            user: user_view(user),
            stats: db.user_stats(user_id)?,
            users: user_views(db.following(user_id)?),
        }))
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    Ok(render(jar, page))
}

/// GET /users/{user_id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let page = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        Ok(Some(FollowPage {
            user: user_view(user),
            stats: db.user_stats(user_id)?,
            users: user_views(db.followers(user_id)?),
        }))
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    Ok(render(jar, page))
}

/// GET /users/{user_id}/likes
pub async fn show_likes(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let page = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        Ok(Some(LikesPage {
            user: user_view(user),
            stats: db.user_stats(user_id)?,
            messages: message_views(db.liked_messages(user_id)?),
        }))
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    Ok(render(jar, page))
}

/// POST /users/follow/{follow_id}
pub async fn follow(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    jar: CookieJar,
    Path(follow_id): Path<i64>,
) -> Result<Response, ApiError> {
    let my_id = me.id;
    let back = format!("/users/{}/following", my_id);
    if follow_id == my_id {
        let jar = flash(jar, &state.session, NoticeCategory::Warning, "You cannot follow yourself.");
        return Ok((jar, redirect(&back)).into_response());
    }

    let followed = with_db(&state, move |db| {
        if db.get_user_by_id(follow_id)?.is_none() {
            return Ok(None);
        }
        db.follow(my_id, follow_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    if followed {
        info!("User {} now follows {}", my_id, follow_id);
    }
    Ok(redirect(&back))
}

/// POST /users/stop-following/{follow_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    Path(follow_id): Path<i64>,
) -> Result<Response, ApiError> {
    let my_id = me.id;
    let back = format!("/users/{}/following", my_id);

    let unfollowed = with_db(&state, move |db| {
        if db.get_user_by_id(follow_id)?.is_none() {
            return Ok(None);
        }
        db.unfollow(my_id, follow_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    if unfollowed {
        info!("User {} stopped following {}", my_id, follow_id);
    }
    Ok(redirect(&back))
}

/// GET /profile/{username}
pub async fn edit_profile_page(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let my_id = me.id;
    let user = with_db(&state, move |db| db.get_user_by_id(my_id))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let email = user.email.clone();
    Ok(render(jar, EditProfilePage {
        user: user_view(user),
        email,
    }))
}

/// POST /profile/{username}. The current password must accompany the change.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ApiError> {
    let back = format!("/profile/{}", me.username);

    if form.username.trim().is_empty() || form.email.trim().is_empty() {
        let jar = flash(jar, &state.session, NoticeCategory::Danger, "Username and email are required.");
        return Ok((jar, redirect(&back)).into_response());
    }

    let changes = ProfileChanges {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        image_url: non_blank(form.image_url),
        header_image_url: non_blank(form.header_image_url),
        bio: non_blank(form.bio),
        location: non_blank(form.location),
    };
    let (my_id, username) = (me.id, me.username);
    let password = form.password;

    let outcome = with_db(&state, move |db| {
        if authenticate(db, &username, &password)?.is_none() {
            return Ok(None);
        }
        db.update_profile(my_id, &changes).map(Some)
    })
    .await;

    match outcome {
        Ok(Some(user)) => {
            info!("Profile updated for {}", user);
            let jar = flash(jar, &state.session, NoticeCategory::Success, "Profile updated.");
            Ok((jar, redirect(&format!("/users/{}", user.id))).into_response())
        }
        Ok(None) => {
            let jar = flash(jar, &state.session, NoticeCategory::Danger, "Wrong password, please try again.");
            Ok((jar, redirect(&back)).into_response())
        }
        Err(ApiError::Integrity(detail)) => {
            warn!("Profile update rejected: {}", detail);
            let jar = flash(jar, &state.session, NoticeCategory::Danger, "Username or email already taken.");
            Ok((jar, redirect(&back)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// POST /profile/{username}/delete
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(me): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let my_id = me.id;
    with_db(&state, move |db| db.delete_user(my_id)).await?;
    info!("Deleted account {} ({})", me.username, me.id);

    let jar = session::sign_out(jar);
    let jar = flash(jar, &state.session, NoticeCategory::Success, "Your account has been deleted.");
    Ok((jar, redirect("/signup")).into_response())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
