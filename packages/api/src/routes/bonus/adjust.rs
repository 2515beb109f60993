use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::{
    booking::ledger::{ManualAdjustOutcome, manual_adjust},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

use super::user_bonus::BonusTransactionItem;

#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    /// Signed; negative values debit.
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceData {
    pub balance: i64,
    pub transaction: BonusTransactionItem,
}

#[derive(Debug, Serialize)]
pub struct AdjustBalanceResponse {
    pub success: bool,
    pub data: AdjustBalanceData,
}

/// POST /bonus/user/{user_id}/adjust - Admin manual credit or debit
///
/// The balance read, overdraft check and write all run on one transaction.
#[tracing::instrument(name = "POST /bonus/user/{user_id}/adjust", skip(state, caller, body))]
pub async fn adjust_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(user_id): Path<String>,
    Json(body): Json<AdjustBalanceRequest>,
) -> Result<Json<AdjustBalanceResponse>, ApiError> {
    caller.require_admin()?;

    if body.amount == 0 {
        return Err(ApiError::bad_request("amount must be non-zero"));
    }

    let now = Utc::now().naive_utc();
    let amount = body.amount;
    let description = body.description.clone();
    let txn_user_id = user_id.clone();

    let outcome = state
        .db
        .transaction::<_, ManualAdjustOutcome, ApiError>(move |txn| {
            Box::pin(async move {
                Ok(manual_adjust(txn, &txn_user_id, amount, description, now).await?)
            })
        })
        .await?;

    let (balance, transaction) = match outcome {
        ManualAdjustOutcome::Applied {
            balance,
            transaction,
        } => (balance, transaction),
        ManualAdjustOutcome::InsufficientBalance { requested, balance } => {
            return Err(ApiError::unprocessable(format!(
                "Debit of {} exceeds balance {}",
                requested, balance
            )));
        }
        ManualAdjustOutcome::UserMissing => {
            return Err(ApiError::not_found("User not found"));
        }
    };

    state.invalidate_bonus_cache(&user_id);

    tracing::info!(
        user_id = %user_id,
        amount,
        balance,
        "Manual bonus adjustment"
    );

    Ok(Json(AdjustBalanceResponse {
        success: true,
        data: AdjustBalanceData {
            balance,
            transaction: transaction.into(),
        },
    }))
}
