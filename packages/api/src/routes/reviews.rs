use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::{
    entity::{review, specialist},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/{review_id}/reply", post(reply_to_review))
        .route("/{review_id}/publish", post(toggle_published))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub specialist_id: String,
    pub author_name: String,
    pub rating: i32,
    pub text: String,
    pub reply: Option<String>,
    pub is_published: bool,
    pub created_at: String,
}

impl From<review::Model> for ReviewResponse {
    fn from(r: review::Model) -> Self {
        Self {
            id: r.id,
            specialist_id: r.specialist_id,
            author_name: r.author_name,
            rating: r.rating,
            text: r.text,
            reply: r.reply,
            is_published: r.is_published,
            created_at: r.created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub specialist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub specialist_id: String,
    pub author_name: String,
    pub rating: i32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub reply: String,
}

/// GET /reviews - Published reviews, optionally for one specialist.
/// Admins also see unpublished ones.
#[tracing::instrument(name = "GET /reviews", skip(state, caller))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let mut query_builder = review::Entity::find();
    if let Some(specialist_id) = &query.specialist_id {
        query_builder = query_builder.filter(review::Column::SpecialistId.eq(specialist_id));
    }
    if !caller.is_admin() {
        query_builder = query_builder.filter(review::Column::IsPublished.eq(true));
    }

    let reviews = query_builder
        .order_by_desc(review::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(reviews.into_iter().map(Into::into).collect()))
}

/// POST /reviews - Leave a review for a specialist
///
/// Open to guests; authenticated callers get the review tied to their
/// account. New reviews start unpublished until an admin approves them.
#[tracing::instrument(name = "POST /reviews", skip(state, caller, body))]
pub async fn create_review(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    if !(1..=5).contains(&body.rating) {
        return Err(ApiError::bad_request("rating must be between 1 and 5"));
    }
    if body.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    if body.author_name.trim().is_empty() {
        return Err(ApiError::bad_request("authorName must not be empty"));
    }

    specialist::Entity::find_by_id(&body.specialist_id)
        .filter(specialist::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Specialist not found"))?;

    let created = review::ActiveModel {
        id: Set(cuid2::create_id()),
        user_id: Set(caller.sub().ok()),
        specialist_id: Set(body.specialist_id),
        author_name: Set(body.author_name),
        rating: Set(body.rating),
        text: Set(body.text),
        reply: Set(None),
        is_published: Set(false),
        created_at: Set(Utc::now().naive_utc()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(
        review_id = %created.id,
        specialist_id = %created.specialist_id,
        rating = created.rating,
        "Review submitted"
    );

    Ok(Json(created.into()))
}

/// POST /reviews/{review_id}/reply - Attach an admin reply
#[tracing::instrument(name = "POST /reviews/{review_id}/reply", skip(state, caller, body))]
pub async fn reply_to_review(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(review_id): Path<String>,
    Json(body): Json<ReplyRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    caller.require_admin()?;

    if body.reply.trim().is_empty() {
        return Err(ApiError::bad_request("reply must not be empty"));
    }

    let existing = review::Entity::find_by_id(&review_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let mut active: review::ActiveModel = existing.into();
    active.reply = Set(Some(body.reply));
    let updated = active.update(&state.db).await?;

    tracing::info!(review_id = %review_id, "Review reply saved");

    Ok(Json(updated.into()))
}

/// POST /reviews/{review_id}/publish - Flip publication state (admin)
#[tracing::instrument(name = "POST /reviews/{review_id}/publish", skip(state, caller))]
pub async fn toggle_published(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(review_id): Path<String>,
) -> Result<Json<ReviewResponse>, ApiError> {
    caller.require_admin()?;

    let existing = review::Entity::find_by_id(&review_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let next = !existing.is_published;
    let mut active: review::ActiveModel = existing.into();
    active.is_published = Set(next);
    let updated = active.update(&state.db).await?;

    tracing::info!(review_id = %review_id, published = next, "Review publication toggled");

    Ok(Json(updated.into()))
}
