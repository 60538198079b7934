//! HTTP surface of Warbler: credential store, session gate and route handlers.

pub mod auth;
pub mod error;
pub mod flash;
pub mod gate;
pub mod home;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod users;
pub mod view;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
