//! One-shot notices carried to the next rendered page in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use warbler_types::api::{Notice, NoticeCategory};

use crate::session::SessionConfig;

pub const FLASH_COOKIE: &str = "warbler_flash";

/// Queue a notice behind any already pending for this visitor. The cookie
/// carries the same `Secure` attribute as the session cookie.
pub fn flash(
    jar: CookieJar,
    config: &SessionConfig,
    category: NoticeCategory,
    message: impl Into<String>,
) -> CookieJar {
    let mut notices = pending(&jar);
    notices.push(Notice {
        category,
        message: message.into(),
    });

    let cookie = Cookie::build((FLASH_COOKIE, encode(&notices)))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Drain pending notices. The cookie is cleared so each notice renders once.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Notice>) {
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, Vec::new());
    }
    let notices = pending(&jar);
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), notices)
}

fn pending(jar: &CookieJar) -> Vec<Notice> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

fn encode(notices: &[Notice]) -> String {
    B64.encode(serde_json::to_vec(notices).unwrap_or_default())
}

fn decode(value: &str) -> Option<Vec<Notice>> {
    let bytes = B64.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}
