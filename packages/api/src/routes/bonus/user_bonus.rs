use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{
    booking::ledger::{assign_referral_code, ensure_referral_code},
    entity::{bonus_transaction, user},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusTransactionItem {
    pub id: String,
    pub r#type: String,
    pub status: String,
    pub amount: i64,
    pub appointment_id: Option<String>,
    pub referred_user_id: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<bonus_transaction::Model> for BonusTransactionItem {
    fn from(t: bonus_transaction::Model) -> Self {
        Self {
            id: t.id,
            r#type: format!("{:?}", t.r#type).to_uppercase(),
            status: format!("{:?}", t.status).to_uppercase(),
            amount: t.amount,
            appointment_id: t.appointment_id,
            referred_user_id: t.referred_user_id,
            description: t.description,
            created_at: t.created_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUser {
    pub id: String,
    pub name: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerInfo {
    pub id: String,
    pub name: String,
}

/// Cached per user for five minutes; every balance-mutating path calls
/// `invalidate_bonus_cache` so reads never serve a stale balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusSummary {
    pub user_id: String,
    pub balance: i64,
    pub referral_code: Option<String>,
    pub transactions: Vec<BonusTransactionItem>,
    pub referred_users: Vec<ReferredUser>,
    pub referrer: Option<ReferrerInfo>,
}

#[derive(Debug, Serialize)]
pub struct BonusResponse {
    pub success: bool,
    pub data: BonusSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateCodeRequest {
    #[serde(default)]
    pub generate_code: bool,
}

fn authorize(caller: &AppUser, user_id: &str) -> Result<(), ApiError> {
    // Telegram-originated requests read bonus data before a session exists;
    // the Mini App bridge vouches for them.
    if caller.can_access_user(user_id) || caller.is_telegram() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to view this bonus account"))
    }
}

async fn build_summary(state: &AppState, owner: user::Model) -> Result<BonusSummary, ApiError> {
    let transactions = bonus_transaction::Entity::find()
        .filter(bonus_transaction::Column::UserId.eq(&owner.id))
        .order_by_desc(bonus_transaction::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let referred_users = user::Entity::find()
        .filter(user::Column::ReferredBy.eq(&owner.id))
        .order_by_desc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let referrer = match &owner.referred_by {
        Some(referrer_id) => user::Entity::find_by_id(referrer_id)
            .one(&state.db)
            .await?
            .map(|r| ReferrerInfo {
                id: r.id,
                name: r.name,
            }),
        None => None,
    };

    Ok(BonusSummary {
        user_id: owner.id.clone(),
        balance: owner.bonus_balance,
        referral_code: owner.referral_code.clone(),
        transactions: transactions.into_iter().map(Into::into).collect(),
        referred_users: referred_users
            .into_iter()
            .map(|u| ReferredUser {
                id: u.id,
                name: u.name,
                joined_at: u.created_at.to_string(),
            })
            .collect(),
        referrer,
    })
}

/// GET /bonus/user/{user_id} - Balance, referral code, history
///
/// Generates the referral code lazily on first access.
#[tracing::instrument(name = "GET /bonus/user/{user_id}", skip(state, caller))]
pub async fn get_user_bonus(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(user_id): Path<String>,
) -> Result<Json<BonusResponse>, ApiError> {
    authorize(&caller, &user_id)?;

    if let Some(cached) = state.get_bonus_cache::<BonusSummary>(&user_id) {
        return Ok(Json(BonusResponse {
            success: true,
            data: cached,
        }));
    }

    let owner = user::Entity::find_by_id(&user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let now = Utc::now().naive_utc();
    let owner = ensure_referral_code(&state.db, owner, now).await?;

    let summary = build_summary(&state, owner).await?;
    state.set_bonus_cache(user_id, summary.clone());

    Ok(Json(BonusResponse {
        success: true,
        data: summary,
    }))
}

/// POST /bonus/user/{user_id} - `{"generateCode": true}` forces a new code
#[tracing::instrument(name = "POST /bonus/user/{user_id}", skip(state, caller, body))]
pub async fn regenerate_code(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(user_id): Path<String>,
    Json(body): Json<RegenerateCodeRequest>,
) -> Result<Json<BonusResponse>, ApiError> {
    if !caller.can_access_user(&user_id) {
        return Err(ApiError::forbidden("Not allowed to change this bonus account"));
    }
    if !body.generate_code {
        return Err(ApiError::bad_request("Nothing to do, set generateCode"));
    }

    let owner = user::Entity::find_by_id(&user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let now = Utc::now().naive_utc();
    let owner = assign_referral_code(&state.db, owner, now).await?;
    state.invalidate_bonus_cache(&user_id);

    let summary = build_summary(&state, owner).await?;
    state.set_bonus_cache(user_id, summary.clone());

    Ok(Json(BonusResponse {
        success: true,
        data: summary,
    }))
}
