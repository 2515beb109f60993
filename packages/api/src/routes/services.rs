use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::{entity::service, error::ApiError, middleware::auth::AppUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route(
            "/{service_id}",
            get(get_service).put(update_service).delete(delete_service),
        )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_minutes: i32,
    pub is_active: bool,
}

impl From<service::Model> for ServiceResponse {
    fn from(s: service::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            price: s.price,
            duration_minutes: s.duration_minutes,
            is_active: s.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_minutes: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

fn validate_pricing(price: i64, duration_minutes: i32) -> Result<(), ApiError> {
    if price < 0 {
        return Err(ApiError::bad_request("price cannot be negative"));
    }
    if duration_minutes <= 0 {
        return Err(ApiError::bad_request("durationMinutes must be positive"));
    }
    Ok(())
}

/// GET /services - Active catalog, admins see everything
#[tracing::instrument(name = "GET /services", skip(state, caller))]
pub async fn list_services(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
) -> Result<Json<Vec<ServiceResponse>>, ApiError> {
    let mut query_builder = service::Entity::find();
    if !caller.is_admin() {
        query_builder = query_builder.filter(service::Column::IsActive.eq(true));
    }

    let services = query_builder
        .order_by_asc(service::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(services.into_iter().map(Into::into).collect()))
}

/// GET /services/{service_id}
#[tracing::instrument(name = "GET /services/{service_id}", skip(state))]
pub async fn get_service(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let row = service::Entity::find_by_id(&service_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    Ok(Json(row.into()))
}

/// POST /services - Add a catalog entry (admin)
#[tracing::instrument(name = "POST /services", skip(state, caller, body))]
pub async fn create_service(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Json(body): Json<CreateServiceRequest>,
) -> Result<Json<ServiceResponse>, ApiError> {
    caller.require_admin()?;

    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    validate_pricing(body.price, body.duration_minutes)?;

    let now = Utc::now().naive_utc();
    let created = service::ActiveModel {
        id: Set(cuid2::create_id()),
        name: Set(body.name),
        description: Set(body.description),
        price: Set(body.price),
        duration_minutes: Set(body.duration_minutes),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(service_id = %created.id, "Service created");

    Ok(Json(created.into()))
}

/// PUT /services/{service_id} - Update a catalog entry (admin)
#[tracing::instrument(name = "PUT /services/{service_id}", skip(state, caller, body))]
pub async fn update_service(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(service_id): Path<String>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>, ApiError> {
    caller.require_admin()?;

    let existing = service::Entity::find_by_id(&service_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let price = body.price.unwrap_or(existing.price);
    let duration = body.duration_minutes.unwrap_or(existing.duration_minutes);
    validate_pricing(price, duration)?;

    let mut active: service::ActiveModel = existing.into();
    if let Some(name) = body.name {
        active.name = Set(name);
    }
    if let Some(description) = body.description {
        active.description = Set(Some(description));
    }
    active.price = Set(price);
    active.duration_minutes = Set(duration);
    if let Some(is_active) = body.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(&state.db).await?;

    tracing::info!(service_id = %service_id, "Service updated");

    Ok(Json(updated.into()))
}

/// DELETE /services/{service_id} - Remove a catalog entry (admin)
#[tracing::instrument(name = "DELETE /services/{service_id}", skip(state, caller))]
pub async fn delete_service(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(service_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    caller.require_admin()?;

    let existing = service::Entity::find_by_id(&service_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    service::Entity::delete_by_id(&existing.id)
        .exec(&state.db)
        .await?;

    tracing::info!(service_id = %service_id, "Service deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::validate_pricing;

    #[test]
    fn rejects_negative_price() {
        assert!(validate_pricing(-1, 30).is_err());
        assert!(validate_pricing(0, 30).is_ok());
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert!(validate_pricing(100, 0).is_err());
        assert!(validate_pricing(100, -15).is_err());
        assert!(validate_pricing(100, 45).is_ok());
    }
}
