use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    booking::ledger::{accrue_referral_bonus, cancel_transaction, complete_transaction},
    entity::{
        appointment, bonus_transaction,
        sea_orm_active_enums::{AppointmentStatus, BonusTransactionStatus, BonusTransactionType},
        user,
    },
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

use super::AppointmentResponse;

use super::list_appointments::parse_status;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub data: AppointmentResponse,
}

/// Lifecycle edges. Completed and cancelled rows are terminal apart from
/// archiving.
pub fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Completed)
            | (Confirmed, Cancelled)
            | (Completed, Archived)
            | (Cancelled, Archived)
    )
}

/// PATCH /appointments/{appointment_id}/status
///
/// Admin drives the lifecycle; a specialist may complete their own
/// appointments. Completion settles the pending booking bonus and, on the
/// user's first completed booking, pays the referrer.
#[tracing::instrument(name = "PATCH /appointments/{appointment_id}/status", skip(state, caller, body))]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(caller): Extension<AppUser>,
    Path(appointment_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let Some(new_status) = parse_status(&body.status) else {
        return Err(ApiError::bad_request(format!(
            "Unknown status: {}",
            body.status
        )));
    };

    let row = appointment::Entity::find_by_id(&appointment_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NOT_FOUND)?;

    let own_specialist = caller
        .specialist_id()
        .map(|sid| sid == row.specialist_id)
        .unwrap_or(false);
    let allowed = caller.is_admin()
        || (own_specialist && new_status == AppointmentStatus::Completed);
    if !allowed {
        return Err(ApiError::forbidden("Not allowed to change this appointment"));
    }

    if !transition_allowed(row.status, new_status) {
        return Err(ApiError::conflict(format!(
            "Cannot move appointment from {:?} to {:?}",
            row.status, new_status
        )));
    }

    let now = Utc::now().naive_utc();
    let referral_amount = state.referral_bonus_amount().await?;
    let affected_user = row.user_id.clone();

    let updated = state
        .db
        .transaction::<_, appointment::Model, ApiError>(move |txn| {
            Box::pin(async move {
                let mut active: appointment::ActiveModel = row.clone().into();
                active.status = Set(new_status);
                active.updated_at = Set(now);
                let updated = active.update(txn).await?;

                let pending_accrual = bonus_transaction::Entity::find()
                    .filter(bonus_transaction::Column::AppointmentId.eq(&row.id))
                    .filter(bonus_transaction::Column::Type.eq(BonusTransactionType::Booking))
                    .filter(bonus_transaction::Column::Status.eq(BonusTransactionStatus::Pending))
                    .one(txn)
                    .await?;

                match new_status {
                    AppointmentStatus::Completed => {
                        if let Some(accrual) = pending_accrual {
                            complete_transaction(txn, accrual, now).await?;
                        }
                        if let Some(user_id) = &row.user_id {
                            settle_referral(txn, user_id, referral_amount, now).await?;
                        }
                    }
                    AppointmentStatus::Cancelled | AppointmentStatus::Archived => {
                        if let Some(accrual) = pending_accrual {
                            cancel_transaction(txn, accrual, now).await?;
                        }
                    }
                    _ => {}
                }

                Ok(updated)
            })
        })
        .await?;

    if let Some(user_id) = &affected_user {
        state.invalidate_bonus_cache(user_id);
    }

    tracing::info!(
        appointment_id = %appointment_id,
        status = ?updated.status,
        "Appointment status updated"
    );

    Ok(Json(UpdateStatusResponse {
        success: true,
        data: updated.into(),
    }))
}

/// First completed booking of a referred user pays the referrer once. An
/// existing `Referral` transaction for the user marks the reward as settled,
/// so archiving completed appointments cannot trigger a second payout.
async fn settle_referral<C: sea_orm::ConnectionTrait>(
    txn: &C,
    user_id: &str,
    referral_amount: i64,
    now: chrono::NaiveDateTime,
) -> Result<(), ApiError> {
    let Some(owner) = user::Entity::find_by_id(user_id).one(txn).await? else {
        return Ok(());
    };
    let Some(referrer_id) = &owner.referred_by else {
        return Ok(());
    };

    let already_rewarded = bonus_transaction::Entity::find()
        .filter(bonus_transaction::Column::Type.eq(BonusTransactionType::Referral))
        .filter(bonus_transaction::Column::ReferredUserId.eq(user_id))
        .one(txn)
        .await?
        .is_some();
    if already_rewarded {
        return Ok(());
    }

    let Some(referrer) = user::Entity::find_by_id(referrer_id).one(txn).await? else {
        tracing::warn!(user_id = %user_id, referrer_id = %referrer_id, "Referrer missing");
        return Ok(());
    };

    accrue_referral_bonus(txn, &referrer, user_id, referral_amount, now).await?;
    tracing::info!(
        referrer_id = %referrer.id,
        referred_user_id = %user_id,
        amount = referral_amount,
        "Referral bonus credited"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_transitions() {
        assert!(transition_allowed(
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed
        ));
        assert!(transition_allowed(
            AppointmentStatus::Pending,
            AppointmentStatus::Cancelled
        ));
        assert!(!transition_allowed(
            AppointmentStatus::Pending,
            AppointmentStatus::Completed
        ));
    }

    #[test]
    fn terminal_states() {
        assert!(!transition_allowed(
            AppointmentStatus::Completed,
            AppointmentStatus::Confirmed
        ));
        assert!(!transition_allowed(
            AppointmentStatus::Archived,
            AppointmentStatus::Pending
        ));
        assert!(transition_allowed(
            AppointmentStatus::Completed,
            AppointmentStatus::Archived
        ));
        assert!(transition_allowed(
            AppointmentStatus::Cancelled,
            AppointmentStatus::Archived
        ));
    }

    #[test]
    fn no_self_transition() {
        assert!(!transition_allowed(
            AppointmentStatus::Confirmed,
            AppointmentStatus::Confirmed
        ));
    }

    use crate::entity::sea_orm_active_enums::UserRole;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn moment() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn account(id: &str, referred_by: Option<&str>, balance: i64) -> user::Model {
        user::Model {
            id: id.into(),
            name: "Anna".into(),
            email: format!("{}@example.com", id),
            phone: None,
            role: UserRole::User,
            bonus_balance: balance,
            referral_code: None,
            referred_by: referred_by.map(Into::into),
            telegram_id: None,
            created_at: moment(),
            updated_at: moment(),
        }
    }

    fn referral_row(referred_user_id: &str) -> bonus_transaction::Model {
        bonus_transaction::Model {
            id: "t1".into(),
            user_id: "referrer".into(),
            r#type: BonusTransactionType::Referral,
            status: BonusTransactionStatus::Completed,
            amount: 300,
            appointment_id: None,
            referred_user_id: Some(referred_user_id.into()),
            description: None,
            created_at: moment(),
            updated_at: moment(),
        }
    }

    #[tokio::test]
    async fn referral_not_paid_twice() {
        // A prior Referral transaction settles the reward for good, even if
        // the user's completed appointments were archived since.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account("u1", Some("referrer"), 0)]])
            .append_query_results([vec![referral_row("u1")]])
            .into_connection();

        settle_referral(&db, "u1", 300, moment()).await.unwrap();

        // Only the two lookups ran; no balance write, no new transaction.
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn referral_paid_on_first_completion() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account("u1", Some("referrer"), 0)]])
            .append_query_results([Vec::<bonus_transaction::Model>::new()])
            .append_query_results([vec![account("referrer", None, 0)]])
            .append_query_results([vec![account("referrer", None, 300)]])
            .append_query_results([vec![referral_row("u1")]])
            .into_connection();

        settle_referral(&db, "u1", 300, moment()).await.unwrap();

        // Lookup, settled check, referrer fetch, balance update, ledger insert.
        assert_eq!(db.into_transaction_log().len(), 5);
    }

    #[tokio::test]
    async fn no_referrer_no_payout() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account("u1", None, 0)]])
            .into_connection();

        settle_referral(&db, "u1", 300, moment()).await.unwrap();

        assert_eq!(db.into_transaction_log().len(), 1);
    }
}
