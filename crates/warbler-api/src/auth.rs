use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_db::Database;
use warbler_db::models::{NewUser, UserRow};
use warbler_types::api::{FormPage, LoginForm, NoticeCategory, SignupForm};

use crate::error::ApiError;
use crate::flash::flash;
use crate::session;
use crate::state::{AppState, with_db};
use crate::view::{redirect, render};

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Usernames are stored and looked up without surrounding whitespace.
pub fn normalize_username(username: &str) -> &str {
    username.trim()
}

/// Validate sign-up input and hash the password. The returned account is
/// pending: persisting it is up to the caller.
pub fn signup(
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
    image_url: Option<&str>,
) -> Result<NewUser, ApiError> {
    let password = match password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::Validation("Password is required.".into())),
    };
    let username = match username.map(normalize_username) {
        Some(u) if !u.is_empty() => u,
        _ => return Err(ApiError::Validation("Username is required.".into())),
    };
    let email = match email.map(str::trim) {
        Some(e) if !e.is_empty() => e,
        _ => return Err(ApiError::Validation("Email is required.".into())),
    };

    Ok(NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        image_url: image_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
    })
}

/// The account named `username`, if `password` matches it.
pub fn authenticate(db: &Database, username: &str, password: &str) -> warbler_db::Result<Option<UserRow>> {
    let user = db.get_user_by_username(normalize_username(username))?;
    Ok(user.filter(|u| verify_password(password, &u.password)))
}

// -- Handlers --

pub async fn signup_page(jar: CookieJar) -> Response {
    render(jar, FormPage {
        form: "signup",
        fields: &["username", "email", "password", "image_url"],
    })
}

pub async fn signup_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, ApiError> {
    let pending = match signup(
        form.username.as_deref(),
        form.email.as_deref(),
        form.password.as_deref(),
        form.image_url.as_deref(),
    ) {
        Ok(pending) => pending,
        Err(ApiError::Validation(msg)) => {
            return Ok((flash(jar, &state.session, NoticeCategory::Danger, msg), redirect("/signup")).into_response());
        }
        Err(e) => return Err(e),
    };

    let user = match with_db(&state, move |db| db.insert_user(&pending)).await {
        Ok(user) => user,
        Err(ApiError::Integrity(detail)) => {
            warn!("Signup rejected: {}", detail);
            let jar = flash(jar, &state.session, NoticeCategory::Danger, "Username or email already taken.");
            return Ok((jar, redirect("/signup")).into_response());
        }
        Err(e) => return Err(e),
    };

    info!("New account {}", user);
    let jar = session::sign_in(jar, &state.session, user.id)?;
    let jar = flash(jar, &state.session, NoticeCategory::Success, format!("Welcome to Warbler, {}!", user.username));
    Ok((jar, redirect("/")).into_response())
}

pub async fn login_page(jar: CookieJar) -> Response {
    render(jar, FormPage {
        form: "login",
        fields: &["username", "password"],
    })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let user = with_db(&state, move |db| authenticate(db, &form.username, &form.password)).await?;

    let Some(user) = user else {
        let jar = flash(jar, &state.session, NoticeCategory::Danger, "Invalid credentials.");
        return Ok((jar, redirect("/login")).into_response());
    };

    info!("{} signed in", user.username);
    let jar = session::sign_in(jar, &state.session, user.id)?;
    let jar = flash(jar, &state.session, NoticeCategory::Success, format!("Hello, {}!", user.username));
    Ok((jar, redirect("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = session::sign_out(jar);
    let jar = flash(jar, &state.session, NoticeCategory::Success, "You have successfully logged out.");
    (jar, redirect("/login")).into_response()
}
