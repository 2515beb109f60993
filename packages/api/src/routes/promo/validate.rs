use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    booking::promo::{PromoOutcome, resolve_promo},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest {
    pub code: String,
    pub service_id: Option<String>,
    pub price: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoResponse {
    pub valid: bool,
    pub discount_amount: i64,
    pub final_price: i64,
}

/// POST /promo/validate - Discount quote without side effects
///
/// Mirrors the booking-time resolution: an unknown or inapplicable code is
/// not an error, just a zero quote.
#[tracing::instrument(name = "POST /promo/validate", skip(state, body))]
pub async fn validate_promo(
    State(state): State<AppState>,
    Json(body): Json<ValidatePromoRequest>,
) -> Result<Json<ValidatePromoResponse>, ApiError> {
    if body.price < 0 {
        return Err(ApiError::bad_request("price cannot be negative"));
    }

    let now = Utc::now().naive_utc();
    let outcome = resolve_promo(
        &state.db,
        &body.code,
        body.service_id.as_deref(),
        body.price,
        now,
    )
    .await?;

    let response = match outcome {
        PromoOutcome::Applied {
            discount_amount,
            final_price,
            ..
        } => ValidatePromoResponse {
            valid: true,
            discount_amount,
            final_price,
        },
        PromoOutcome::NotApplied => ValidatePromoResponse {
            valid: false,
            discount_amount: 0,
            final_price: body.price,
        },
    };

    Ok(Json(response))
}
