use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    booking::promo::promo_is_valid,
    entity::{promo_code, promo_code_service, sea_orm_active_enums::DiscountType},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListCodesQuery {
    /// Filter to currently valid codes
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeResponse {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: i64,
    pub starts_at: String,
    pub expires_at: Option<String>,
    pub max_uses: Option<i64>,
    pub used_count: i64,
    pub is_active: bool,
    pub is_valid: bool,
    pub service_ids: Vec<String>,
    pub created_at: String,
}

impl PromoCodeResponse {
    fn from_model(p: promo_code::Model, service_ids: Vec<String>) -> Self {
        let now = Utc::now().naive_utc();
        let is_valid = promo_is_valid(&p, now);
        Self {
            id: p.id,
            code: p.code,
            description: p.description,
            discount_type: format!("{:?}", p.discount_type).to_uppercase(),
            discount_value: p.discount_value,
            starts_at: p.starts_at.to_string(),
            expires_at: p.expires_at.map(|e| e.to_string()),
            max_uses: p.max_uses,
            used_count: p.used_count,
            is_active: p.is_active,
            is_valid,
            service_ids,
            created_at: p.created_at.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeRequest {
    pub code: String,
    pub description: Option<String>,
    /// "percentage" or "fixed"
    pub discount_type: String,
    pub discount_value: i64,
    /// ISO 8601; defaults to now
    pub starts_at: Option<String>,
    pub expires_at: Option<String>,
    pub max_uses: Option<i64>,
    /// Empty or absent = applies to every service
    #[serde(default)]
    pub service_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCodeRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<i64>,
    pub starts_at: Option<String>,
    pub expires_at: Option<String>,
    pub max_uses: Option<i64>,
    pub is_active: Option<bool>,
    pub service_ids: Option<Vec<String>>,
}

fn parse_discount_type(raw: &str) -> Result<DiscountType, ApiError> {
    match raw.to_lowercase().as_str() {
        "percentage" => Ok(DiscountType::Percentage),
        "fixed" | "fixed_amount" => Ok(DiscountType::Fixed),
        _ => Err(ApiError::bad_request(
            "discountType must be 'percentage' or 'fixed'",
        )),
    }
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.fZ")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| ApiError::bad_request(format!("Invalid datetime: {}", raw)))
}

fn validate_value(discount_type: DiscountType, value: i64) -> Result<(), ApiError> {
    if value < 0 {
        return Err(ApiError::bad_request("Discount value cannot be negative"));
    }
    if discount_type == DiscountType::Percentage && value > 100 {
        return Err(ApiError::bad_request(
            "Percentage discount must be between 0 and 100",
        ));
    }
    Ok(())
}

async fn service_ids_for(state: &AppState, promo_id: &str) -> Result<Vec<String>, ApiError> {
    Ok(promo_code_service::Entity::find()
        .filter(promo_code_service::Column::PromoCodeId.eq(promo_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|r| r.service_id)
        .collect())
}

/// GET /promo/codes - List promo codes (admin)
#[tracing::instrument(name = "GET /promo/codes", skip(state, caller))]
pub async fn list_codes(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Query(query): Query<ListCodesQuery>,
) -> Result<Json<Vec<PromoCodeResponse>>, ApiError> {
    caller.require_admin()?;

    let mut query_builder = promo_code::Entity::find();
    if query.active_only {
        query_builder = query_builder.filter(promo_code::Column::IsActive.eq(true));
    }

    let codes = query_builder
        .order_by_desc(promo_code::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let mut response = Vec::with_capacity(codes.len());
    for promo in codes {
        let service_ids = service_ids_for(&state, &promo.id).await?;
        response.push(PromoCodeResponse::from_model(promo, service_ids));
    }

    Ok(Json(response))
}

/// GET /promo/codes/{promo_id} - Fetch one promo code (admin)
#[tracing::instrument(name = "GET /promo/codes/{promo_id}", skip(state, caller))]
pub async fn get_code(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(promo_id): Path<String>,
) -> Result<Json<PromoCodeResponse>, ApiError> {
    caller.require_admin()?;

    let promo = promo_code::Entity::find_by_id(&promo_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let service_ids = service_ids_for(&state, &promo.id).await?;
    Ok(Json(PromoCodeResponse::from_model(promo, service_ids)))
}

/// POST /promo/codes - Create a promo code (admin)
#[tracing::instrument(name = "POST /promo/codes", skip(state, caller, body))]
pub async fn create_code(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Json(body): Json<CreateCodeRequest>,
) -> Result<Json<PromoCodeResponse>, ApiError> {
    caller.require_admin()?;

    let code = body.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ApiError::bad_request("code must not be empty"));
    }

    let existing = promo_code::Entity::find()
        .filter(promo_code::Column::Code.eq(&code))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request(
            "A promo code with this code already exists",
        ));
    }

    let discount_type = parse_discount_type(&body.discount_type)?;
    validate_value(discount_type, body.discount_value)?;

    let now = Utc::now().naive_utc();
    let starts_at = match &body.starts_at {
        Some(raw) => parse_datetime(raw)?,
        None => now,
    };
    let expires_at = body.expires_at.as_deref().map(parse_datetime).transpose()?;

    let id = cuid2::create_id();
    let service_ids = body.service_ids.clone();
    let description = body.description.clone();
    let max_uses = body.max_uses;
    let discount_value = body.discount_value;
    let insert_code = code.clone();

    let created = state
        .db
        .transaction::<_, promo_code::Model, ApiError>(move |txn| {
            Box::pin(async move {
                let created = promo_code::ActiveModel {
                    id: Set(id.clone()),
                    code: Set(insert_code),
                    description: Set(description),
                    discount_type: Set(discount_type),
                    discount_value: Set(discount_value),
                    starts_at: Set(starts_at),
                    expires_at: Set(expires_at),
                    max_uses: Set(max_uses),
                    used_count: Set(0),
                    is_active: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                for service_id in service_ids {
                    promo_code_service::ActiveModel {
                        promo_code_id: Set(id.clone()),
                        service_id: Set(service_id),
                    }
                    .insert(txn)
                    .await?;
                }

                Ok(created)
            })
        })
        .await?;

    tracing::info!(promo_id = %created.id, code = %created.code, "Promo code created");

    let service_ids = service_ids_for(&state, &created.id).await?;
    Ok(Json(PromoCodeResponse::from_model(created, service_ids)))
}

/// PATCH /promo/codes/{promo_id} - Update a promo code (admin)
#[tracing::instrument(name = "PATCH /promo/codes/{promo_id}", skip(state, caller, body))]
pub async fn update_code(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(promo_id): Path<String>,
    Json(body): Json<UpdateCodeRequest>,
) -> Result<Json<PromoCodeResponse>, ApiError> {
    caller.require_admin()?;

    let existing = promo_code::Entity::find_by_id(&promo_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let mut active: promo_code::ActiveModel = existing.clone().into();

    if let Some(code) = &body.code {
        let code = code.trim().to_uppercase();
        let duplicate = promo_code::Entity::find()
            .filter(promo_code::Column::Code.eq(&code))
            .filter(promo_code::Column::Id.ne(&promo_id))
            .one(&state.db)
            .await?;
        if duplicate.is_some() {
            return Err(ApiError::bad_request(
                "A promo code with this code already exists",
            ));
        }
        active.code = Set(code);
    }

    if let Some(description) = body.description {
        active.description = Set(Some(description));
    }

    let discount_type = match &body.discount_type {
        Some(raw) => {
            let parsed = parse_discount_type(raw)?;
            active.discount_type = Set(parsed);
            parsed
        }
        None => existing.discount_type,
    };

    if let Some(value) = body.discount_value {
        validate_value(discount_type, value)?;
        active.discount_value = Set(value);
    }

    if let Some(raw) = &body.starts_at {
        active.starts_at = Set(parse_datetime(raw)?);
    }
    if let Some(raw) = &body.expires_at {
        active.expires_at = Set(Some(parse_datetime(raw)?));
    }
    if let Some(max_uses) = body.max_uses {
        active.max_uses = Set(Some(max_uses));
    }
    if let Some(is_active) = body.is_active {
        active.is_active = Set(is_active);
    }

    let now = Utc::now().naive_utc();
    active.updated_at = Set(now);

    let service_ids = body.service_ids.clone();
    let txn_promo_id = promo_id.clone();

    let updated = state
        .db
        .transaction::<_, promo_code::Model, ApiError>(move |txn| {
            Box::pin(async move {
                let updated = active.update(txn).await?;

                // Replacing the restriction set wholesale keeps the join
                // table in step with the request.
                if let Some(service_ids) = service_ids {
                    promo_code_service::Entity::delete_many()
                        .filter(promo_code_service::Column::PromoCodeId.eq(&txn_promo_id))
                        .exec(txn)
                        .await?;
                    for service_id in service_ids {
                        promo_code_service::ActiveModel {
                            promo_code_id: Set(txn_promo_id.clone()),
                            service_id: Set(service_id),
                        }
                        .insert(txn)
                        .await?;
                    }
                }

                Ok(updated)
            })
        })
        .await?;

    tracing::info!(promo_id = %promo_id, "Promo code updated");

    let service_ids = service_ids_for(&state, &updated.id).await?;
    Ok(Json(PromoCodeResponse::from_model(updated, service_ids)))
}

/// DELETE /promo/codes/{promo_id} - Delete a promo code (admin)
#[tracing::instrument(name = "DELETE /promo/codes/{promo_id}", skip(state, caller))]
pub async fn delete_code(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(promo_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    caller.require_admin()?;

    let existing = promo_code::Entity::find_by_id(&promo_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    promo_code::Entity::delete_by_id(&existing.id)
        .exec(&state.db)
        .await?;

    tracing::info!(promo_id = %promo_id, "Promo code deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /promo/codes/{promo_id}/toggle - Flip the active flag (admin)
#[tracing::instrument(name = "POST /promo/codes/{promo_id}/toggle", skip(state, caller))]
pub async fn toggle_code(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(promo_id): Path<String>,
) -> Result<Json<PromoCodeResponse>, ApiError> {
    caller.require_admin()?;

    let existing = promo_code::Entity::find_by_id(&promo_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let new_active = !existing.is_active;

    let mut active: promo_code::ActiveModel = existing.into();
    active.is_active = Set(new_active);
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(&state.db).await?;

    tracing::info!(promo_id = %promo_id, is_active = new_active, "Promo code toggled");

    let service_ids = service_ids_for(&state, &updated.id).await?;
    Ok(Json(PromoCodeResponse::from_model(updated, service_ids)))
}
