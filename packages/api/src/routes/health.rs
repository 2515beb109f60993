use axum::{Json, Router, extract::State, routing::get};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::{Value, json};

use crate::{error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[tracing::instrument(name = "GET /health", skip(state))]
async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1",
        ))
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}
