use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};
use middleware::auth::auth_middleware;
use state::State;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
};

pub mod booking;
pub mod entity;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod routes;
pub mod state;

pub use axum;
pub use sea_orm;

pub mod auth {
    pub use crate::middleware::auth::AppUser;
}

pub fn construct_router(state: Arc<State>) -> Router {
    let router = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/appointments", routes::appointments::routes())
        .nest("/bonus", routes::bonus::routes())
        .nest("/promo", routes::promo::routes())
        .nest("/specialists", routes::specialists::routes())
        .nest("/services", routes::services::routes())
        .nest("/reviews", routes::reviews::routes())
        .with_state(state.clone())
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        );

    Router::new().nest("/api", router)
}
