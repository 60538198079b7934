use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::middleware::{load_session, require_auth, require_signed_in, require_signed_out};
use crate::state::AppState;
use crate::{auth, home, likes, messages, users};

/// Every Warbler route, grouped by the gate in front of it.
pub fn router(state: AppState) -> Router {
    let public: Router<AppState> = Router::new()
        .route("/", get(home::homepage))
        .route("/users", get(users::list_users))
        .route("/users/{user_id}", get(users::show_user))
        .route("/messages/{message_id}", get(messages::show_message));

    let signed_out: Router<AppState> = Router::new()
        .route("/signup", get(auth::signup_page).post(auth::signup_submit))
        .route("/login", get(auth::login_page).post(auth::login))
        .route_layer(from_fn_with_state(state.clone(), require_signed_out));

    let signed_in: Router<AppState> = Router::new()
        .route("/logout", post(auth::logout))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(users::show_likes))
        .route("/users/follow/{follow_id}", post(users::follow))
        .route("/users/stop-following/{follow_id}", post(users::stop_following))
        .route("/users/add_like/{message_id}", post(likes::add_like))
        .route("/users/remove_like/{message_id}", post(likes::remove_like))
        .route(
            "/messages/new",
            get(messages::new_message_page).post(messages::create_message),
        )
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .route_layer(from_fn_with_state(state.clone(), require_signed_in));

    let owner_only: Router<AppState> = Router::new()
        .route(
            "/profile/{username}",
            get(users::edit_profile_page).post(users::edit_profile),
        )
        .route("/profile/{username}/delete", post(users::delete_user))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(signed_out)
        .merge(signed_in)
        .merge(owner_only)
        .layer(from_fn_with_state(state.clone(), load_session))
        .with_state(state)
}
