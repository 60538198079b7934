#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use warbler_api::session::{self, SESSION_COOKIE, SessionConfig};
use warbler_api::{AppState, AppStateInner};
use warbler_db::Database;
use warbler_db::models::{MessageRow, NewUser, UserRow};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        secret: "test-secret".into(),
        ttl_hours: 1,
        secure_cookies: false,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, session_config());
        let router = warbler_api::router(state.clone());
        Self { state, router }
    }

    /// Store an account directly. The password is not usable for login.
    pub fn user(&self, username: &str) -> UserRow {
        self.state
            .db
            .insert_user(&NewUser {
                username: username.into(),
                email: format!("{}@test.com", username),
                password_hash: "HASHED_PASSWORD1".into(),
                image_url: None,
            })
            .unwrap()
    }

    /// Store an account that can log in with `password`.
    pub fn user_with_password(&self, username: &str, password: &str) -> UserRow {
        let email = format!("{}@test.com", username);
        let pending =
            warbler_api::auth::signup(Some(username), Some(&email), Some(password), None).unwrap();
        self.state.db.insert_user(&pending).unwrap()
    }

    pub fn message(&self, user: &UserRow, text: &str) -> MessageRow {
        self.state.db.insert_message(user.id, text).unwrap()
    }

    pub async fn get(&self, uri: &str, cookies: &[String]) -> Response<Body> {
        let request = with_cookies(Request::get(uri), cookies)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post(&self, uri: &str, cookies: &[String], fields: &[(&str, &str)]) -> Response<Body> {
        let request = with_cookies(Request::post(uri), cookies)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form(fields)))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Follow a redirect's flash cookie to `/` and return the notices shown there.
    pub async fn flashes_after(&self, response: &Response<Body>) -> Vec<String> {
        let page = self.get("/", &set_cookies(response)).await;
        let json = body_json(page).await;
        json["flashes"]
            .as_array()
            .map(|notices| {
                notices
                    .iter()
                    .filter_map(|n| n["message"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `Cookie` header value for a session naming `user_id`.
pub fn session_cookie(user_id: i64) -> String {
    let token = session::issue_token(&session_config(), user_id).unwrap();
    format!("{}={}", SESSION_COOKIE, token)
}

/// `name=value` pairs of every non-empty cookie the response sets.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .map(str::to_string)
        .collect()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), to);
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn with_cookies(builder: axum::http::request::Builder, cookies: &[String]) -> axum::http::request::Builder {
    if cookies.is_empty() {
        builder
    } else {
        builder.header(header::COOKIE, cookies.join("; "))
    }
}

fn form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&")
}
