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

use crate::{
    entity::specialist, error::ApiError, middleware::auth::AppUser, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_specialists).post(create_specialist))
        .route(
            "/{specialist_id}",
            get(get_specialist)
                .put(update_specialist)
                .delete(delete_specialist),
        )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistResponse {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
}

impl From<specialist::Model> for SpecialistResponse {
    fn from(s: specialist::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
            title: s.title,
            bio: s.bio,
            photo_url: s.photo_url,
            is_active: s.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpecialistRequest {
    pub name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpecialistRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /specialists - Active profiles, admins see everyone
#[tracing::instrument(name = "GET /specialists", skip(state, caller))]
pub async fn list_specialists(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
) -> Result<Json<Vec<SpecialistResponse>>, ApiError> {
    let mut query_builder = specialist::Entity::find();
    if !caller.is_admin() {
        query_builder = query_builder.filter(specialist::Column::IsActive.eq(true));
    }

    let specialists = query_builder
        .order_by_asc(specialist::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(specialists.into_iter().map(Into::into).collect()))
}

/// GET /specialists/{specialist_id}
#[tracing::instrument(name = "GET /specialists/{specialist_id}", skip(state))]
pub async fn get_specialist(
    State(state): State<AppState>,
    Path(specialist_id): Path<String>,
) -> Result<Json<SpecialistResponse>, ApiError> {
    let row = specialist::Entity::find_by_id(&specialist_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    Ok(Json(row.into()))
}

/// POST /specialists - Create a profile (admin)
#[tracing::instrument(name = "POST /specialists", skip(state, caller, body))]
pub async fn create_specialist(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Json(body): Json<CreateSpecialistRequest>,
) -> Result<Json<SpecialistResponse>, ApiError> {
    caller.require_admin()?;

    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let now = Utc::now().naive_utc();
    let created = specialist::ActiveModel {
        id: Set(cuid2::create_id()),
        user_id: Set(body.user_id),
        name: Set(body.name),
        title: Set(body.title),
        bio: Set(body.bio),
        photo_url: Set(body.photo_url),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(specialist_id = %created.id, "Specialist created");

    Ok(Json(created.into()))
}

/// PUT /specialists/{specialist_id} - Update a profile (admin or the
/// specialist's own account)
#[tracing::instrument(name = "PUT /specialists/{specialist_id}", skip(state, caller, body))]
pub async fn update_specialist(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(specialist_id): Path<String>,
    Json(body): Json<UpdateSpecialistRequest>,
) -> Result<Json<SpecialistResponse>, ApiError> {
    let own_profile = caller
        .specialist_id()
        .map(|sid| sid == specialist_id)
        .unwrap_or(false);
    if !caller.is_admin() && !own_profile {
        return Err(ApiError::forbidden("Not allowed to edit this profile"));
    }

    let existing = specialist::Entity::find_by_id(&specialist_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let mut active: specialist::ActiveModel = existing.into();
    if let Some(name) = body.name {
        active.name = Set(name);
    }
    if let Some(title) = body.title {
        active.title = Set(Some(title));
    }
    if let Some(bio) = body.bio {
        active.bio = Set(Some(bio));
    }
    if let Some(photo_url) = body.photo_url {
        active.photo_url = Set(Some(photo_url));
    }
    if let Some(is_active) = body.is_active {
        // Only admins can deactivate profiles.
        if !caller.is_admin() {
            return Err(ApiError::forbidden("Only admins can change visibility"));
        }
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(&state.db).await?;

    tracing::info!(specialist_id = %specialist_id, "Specialist updated");

    Ok(Json(updated.into()))
}

/// DELETE /specialists/{specialist_id} - Remove a profile (admin)
#[tracing::instrument(name = "DELETE /specialists/{specialist_id}", skip(state, caller))]
pub async fn delete_specialist(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(specialist_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    caller.require_admin()?;

    let existing = specialist::Entity::find_by_id(&specialist_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    specialist::Entity::delete_by_id(&existing.id)
        .exec(&state.db)
        .await?;

    tracing::info!(specialist_id = %specialist_id, "Specialist deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
