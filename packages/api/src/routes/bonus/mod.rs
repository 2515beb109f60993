use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod adjust;
pub mod user_bonus;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/user/{user_id}",
            get(user_bonus::get_user_bonus).post(user_bonus::regenerate_code),
        )
        .route("/user/{user_id}/adjust", post(adjust::adjust_balance))
}
