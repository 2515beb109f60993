use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod codes;
pub mod validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/validate", post(validate::validate_promo))
        .route(
            "/codes",
            get(codes::list_codes).post(codes::create_code),
        )
        .route(
            "/codes/{promo_id}",
            get(codes::get_code)
                .patch(codes::update_code)
                .delete(codes::delete_code),
        )
        .route("/codes/{promo_id}/toggle", post(codes::toggle_code))
}
