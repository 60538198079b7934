//! Session tokens.
//!
//! The session cookie holds a signed token naming only the user id. The
//! account itself is re-read from the store on every request (see
//! `middleware::load_session`), so nothing mutable ever lives in the cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "warbler_session";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

/// The signed-in account for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    SignedIn(CurrentUser),
}

impl Session {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Session::SignedIn(user) => Some(user),
            Session::Anonymous => None,
        }
    }
}

pub fn issue_token(config: &SessionConfig, user_id: i64) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::hours(config.ttl_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign session token: {}", e)))
}

/// User id named by a token, if the signature and expiry check out.
pub fn verify_token(config: &SessionConfig, token: &str) -> Option<i64> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            debug!("Rejected session token: {}", e);
            None
        }
    }
}

/// User id carried by the request's session cookie.
pub fn session_user_id(jar: &CookieJar, config: &SessionConfig) -> Option<i64> {
    let cookie = jar.get(SESSION_COOKIE)?;
    verify_token(config, cookie.value())
}

pub fn sign_in(jar: CookieJar, config: &SessionConfig, user_id: i64) -> Result<CookieJar, ApiError> {
    let token = issue_token(config, user_id)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax);
    Ok(jar.add(cookie))
}

pub fn sign_out(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
