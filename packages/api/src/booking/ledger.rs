use chrono::NaiveDateTime;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};

use crate::entity::{
    bonus_transaction,
    sea_orm_active_enums::{BonusTransactionStatus, BonusTransactionType},
    user,
};

pub const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 10;

/// Explicit outcome of a requested bonus spend. Insufficient balance skips
/// the spend without failing the booking; callers surface the outcome in the
/// response instead of burying it in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum BonusSpendOutcome {
    #[serde(rename_all = "camelCase")]
    Applied { amount: i64 },
    #[serde(rename_all = "camelCase")]
    SkippedInsufficientBalance { requested: i64, balance: i64 },
    NotRequested,
}

/// Spend is only permitted when the full requested amount is covered and the
/// request is positive; partial spends never happen.
pub fn spend_decision(requested: i64, balance: i64) -> BonusSpendOutcome {
    if requested <= 0 {
        return BonusSpendOutcome::NotRequested;
    }
    if requested > balance {
        return BonusSpendOutcome::SkippedInsufficientBalance { requested, balance };
    }
    BonusSpendOutcome::Applied { amount: requested }
}

/// Pending booking accrual sized as a percentage of the paid price.
pub fn booking_bonus_amount(final_price: i64, percent: i64) -> i64 {
    if final_price <= 0 || percent <= 0 {
        return 0;
    }
    final_price * percent / 100
}

/// Debits the balance and writes a Completed `Spent` transaction with a
/// negative amount. The user row is re-read on the caller's transaction so
/// the decision and the write always see the same balance; a row fetched
/// before the transaction began could have changed underneath it.
pub async fn spend_bonus<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    requested: i64,
    appointment_id: &str,
    now: NaiveDateTime,
) -> Result<BonusSpendOutcome, sea_orm::DbErr> {
    if requested <= 0 {
        return Ok(BonusSpendOutcome::NotRequested);
    }

    let Some(user) = user::Entity::find_by_id(user_id).one(db).await? else {
        tracing::warn!(user_id = %user_id, "Bonus spend requested for missing user");
        return Ok(BonusSpendOutcome::NotRequested);
    };

    let outcome = spend_decision(requested, user.bonus_balance);

    match &outcome {
        BonusSpendOutcome::Applied { amount } => {
            let mut active: user::ActiveModel = user.clone().into();
            active.bonus_balance = Set(user.bonus_balance - amount);
            active.updated_at = Set(now);
            active.update(db).await?;

            bonus_transaction::ActiveModel {
                id: Set(cuid2::create_id()),
                user_id: Set(user.id.clone()),
                r#type: Set(BonusTransactionType::Spent),
                status: Set(BonusTransactionStatus::Completed),
                amount: Set(-amount),
                appointment_id: Set(Some(appointment_id.to_string())),
                referred_user_id: Set(None),
                description: Set(Some("Spent on booking".to_string())),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }
        BonusSpendOutcome::SkippedInsufficientBalance { requested, balance } => {
            tracing::warn!(
                user_id = %user.id,
                requested,
                balance,
                "Bonus spend skipped, insufficient balance"
            );
        }
        BonusSpendOutcome::NotRequested => {}
    }

    Ok(outcome)
}

/// Result of an admin manual balance adjustment.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualAdjustOutcome {
    Applied {
        balance: i64,
        transaction: bonus_transaction::Model,
    },
    InsufficientBalance {
        requested: i64,
        balance: i64,
    },
    UserMissing,
}

/// Applies a signed manual adjustment and records a Completed `Manual`
/// transaction. The row is read on the caller's transaction; a debit that
/// would overdraw the balance is refused.
pub async fn manual_adjust<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    amount: i64,
    description: Option<String>,
    now: NaiveDateTime,
) -> Result<ManualAdjustOutcome, sea_orm::DbErr> {
    let Some(owner) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(ManualAdjustOutcome::UserMissing);
    };

    if amount < 0 && owner.bonus_balance + amount < 0 {
        return Ok(ManualAdjustOutcome::InsufficientBalance {
            requested: -amount,
            balance: owner.bonus_balance,
        });
    }

    let new_balance = owner.bonus_balance + amount;
    let mut active: user::ActiveModel = owner.clone().into();
    active.bonus_balance = Set(new_balance);
    active.updated_at = Set(now);
    active.update(db).await?;

    let created = bonus_transaction::ActiveModel {
        id: Set(cuid2::create_id()),
        user_id: Set(owner.id),
        r#type: Set(BonusTransactionType::Manual),
        status: Set(BonusTransactionStatus::Completed),
        amount: Set(amount),
        appointment_id: Set(None),
        referred_user_id: Set(None),
        description: Set(description),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(ManualAdjustOutcome::Applied {
        balance: new_balance,
        transaction: created,
    })
}

/// Credits a Pending `Booking` transaction for a paid appointment. The
/// balance is only adjusted when the transaction later completes.
pub async fn accrue_booking_bonus<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    appointment_id: &str,
    final_price: i64,
    percent: i64,
    now: NaiveDateTime,
) -> Result<Option<bonus_transaction::Model>, sea_orm::DbErr> {
    let amount = booking_bonus_amount(final_price, percent);
    if amount == 0 {
        return Ok(None);
    }

    let created = bonus_transaction::ActiveModel {
        id: Set(cuid2::create_id()),
        user_id: Set(user_id.to_string()),
        r#type: Set(BonusTransactionType::Booking),
        status: Set(BonusTransactionStatus::Pending),
        amount: Set(amount),
        appointment_id: Set(Some(appointment_id.to_string())),
        referred_user_id: Set(None),
        description: Set(Some("Booking bonus".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(Some(created))
}

/// Moves a Pending transaction to Completed and applies its amount to the
/// owner's balance, atomically with respect to the caller's transaction.
pub async fn complete_transaction<C: ConnectionTrait>(
    db: &C,
    transaction: bonus_transaction::Model,
    now: NaiveDateTime,
) -> Result<(), sea_orm::DbErr> {
    if transaction.status != BonusTransactionStatus::Pending {
        return Ok(());
    }

    let Some(owner) = user::Entity::find_by_id(&transaction.user_id).one(db).await? else {
        tracing::warn!(
            transaction_id = %transaction.id,
            user_id = %transaction.user_id,
            "Bonus transaction owner missing, leaving transaction pending"
        );
        return Ok(());
    };

    let mut owner_active: user::ActiveModel = owner.clone().into();
    owner_active.bonus_balance = Set(owner.bonus_balance + transaction.amount);
    owner_active.updated_at = Set(now);
    owner_active.update(db).await?;

    let mut active: bonus_transaction::ActiveModel = transaction.into();
    active.status = Set(BonusTransactionStatus::Completed);
    active.updated_at = Set(now);
    active.update(db).await?;

    Ok(())
}

/// Moves a Pending transaction to Cancelled. The balance was never credited,
/// so nothing is reversed.
pub async fn cancel_transaction<C: ConnectionTrait>(
    db: &C,
    transaction: bonus_transaction::Model,
    now: NaiveDateTime,
) -> Result<(), sea_orm::DbErr> {
    if transaction.status != BonusTransactionStatus::Pending {
        return Ok(());
    }
    let mut active: bonus_transaction::ActiveModel = transaction.into();
    active.status = Set(BonusTransactionStatus::Cancelled);
    active.updated_at = Set(now);
    active.update(db).await?;
    Ok(())
}

/// Credits a referrer with a Completed `Referral` transaction and bumps the
/// balance in the same call.
pub async fn accrue_referral_bonus<C: ConnectionTrait>(
    db: &C,
    referrer: &user::Model,
    referred_user_id: &str,
    amount: i64,
    now: NaiveDateTime,
) -> Result<(), sea_orm::DbErr> {
    if amount <= 0 {
        return Ok(());
    }

    let mut active: user::ActiveModel = referrer.clone().into();
    active.bonus_balance = Set(referrer.bonus_balance + amount);
    active.updated_at = Set(now);
    active.update(db).await?;

    bonus_transaction::ActiveModel {
        id: Set(cuid2::create_id()),
        user_id: Set(referrer.id.clone()),
        r#type: Set(BonusTransactionType::Referral),
        status: Set(BonusTransactionStatus::Completed),
        amount: Set(amount),
        appointment_id: Set(None),
        referred_user_id: Set(Some(referred_user_id.to_string())),
        description: Set(Some("Referral bonus".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(())
}

/// 8 uppercase hex characters.
pub fn generate_referral_code<R: Rng>(rng: &mut R) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    (0..REFERRAL_CODE_LEN)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect()
}

/// Lazily assigns a referral code on first access. Collision-checked against
/// every existing code with a bounded number of attempts; on exhaustion the
/// user is returned unchanged and the miss is logged.
pub async fn ensure_referral_code<C: ConnectionTrait>(
    db: &C,
    owner: user::Model,
    now: NaiveDateTime,
) -> Result<user::Model, sea_orm::DbErr> {
    if owner.referral_code.is_some() {
        return Ok(owner);
    }
    assign_referral_code(db, owner, now).await
}

/// Overwrites the referral code with a fresh unique one.
pub async fn assign_referral_code<C: ConnectionTrait>(
    db: &C,
    owner: user::Model,
    now: NaiveDateTime,
) -> Result<user::Model, sea_orm::DbErr> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        // ThreadRng is not Send, so it must not live across the await below.
        let code = generate_referral_code(&mut rand::rng());
        let taken = user::Entity::find()
            .filter(user::Column::ReferralCode.eq(&code))
            .one(db)
            .await?
            .is_some();
        if taken {
            continue;
        }

        let mut active: user::ActiveModel = owner.clone().into();
        active.referral_code = Set(Some(code.clone()));
        active.updated_at = Set(now);
        let updated = active.update(db).await?;
        tracing::info!(user_id = %updated.id, code = %code, "Referral code generated");
        return Ok(updated);
    }

    tracing::error!(
        user_id = %owner.id,
        attempts = REFERRAL_CODE_ATTEMPTS,
        "Gave up generating a unique referral code"
    );
    Ok(owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_requires_full_coverage() {
        // Requesting 500 with a balance of 300 skips the spend entirely.
        assert_eq!(
            spend_decision(500, 300),
            BonusSpendOutcome::SkippedInsufficientBalance {
                requested: 500,
                balance: 300
            }
        );
        assert_eq!(
            spend_decision(300, 300),
            BonusSpendOutcome::Applied { amount: 300 }
        );
        assert_eq!(
            spend_decision(100, 300),
            BonusSpendOutcome::Applied { amount: 100 }
        );
    }

    #[test]
    fn non_positive_spend_not_requested() {
        assert_eq!(spend_decision(0, 300), BonusSpendOutcome::NotRequested);
        assert_eq!(spend_decision(-50, 300), BonusSpendOutcome::NotRequested);
    }

    #[test]
    fn booking_accrual_math() {
        assert_eq!(booking_bonus_amount(1800, 5), 90);
        assert_eq!(booking_bonus_amount(2000, 10), 200);
        assert_eq!(booking_bonus_amount(0, 5), 0);
        assert_eq!(booking_bonus_amount(-100, 5), 0);
        assert_eq!(booking_bonus_amount(1800, 0), 0);
    }

    #[test]
    fn referral_code_shape() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let code = generate_referral_code(&mut rng);
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(code.chars().all(|c| !c.is_ascii_lowercase()));
        }
    }

    use crate::entity::sea_orm_active_enums::UserRole;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn moment() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn account(balance: i64) -> user::Model {
        user::Model {
            id: "u1".into(),
            name: "Anna".into(),
            email: "anna@example.com".into(),
            phone: None,
            role: UserRole::User,
            bonus_balance: balance,
            referral_code: None,
            referred_by: None,
            telegram_id: None,
            created_at: moment(),
            updated_at: moment(),
        }
    }

    fn ledger_row(r#type: BonusTransactionType, amount: i64) -> bonus_transaction::Model {
        bonus_transaction::Model {
            id: "t1".into(),
            user_id: "u1".into(),
            r#type,
            status: BonusTransactionStatus::Completed,
            amount,
            appointment_id: None,
            referred_user_id: None,
            description: None,
            created_at: moment(),
            updated_at: moment(),
        }
    }

    #[tokio::test]
    async fn spend_decides_from_the_stored_balance() {
        // The balance read on the connection drives the outcome, not
        // whatever the caller fetched earlier.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account(50)]])
            .into_connection();
        let outcome = spend_bonus(&db, "u1", 100, "a1", moment()).await.unwrap();
        assert_eq!(
            outcome,
            BonusSpendOutcome::SkippedInsufficientBalance {
                requested: 100,
                balance: 50
            }
        );
    }

    #[tokio::test]
    async fn spend_applies_against_a_concurrently_raised_balance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account(800)]])
            .append_query_results([vec![account(700)]])
            .append_query_results([vec![ledger_row(BonusTransactionType::Spent, -100)]])
            .into_connection();
        let outcome = spend_bonus(&db, "u1", 100, "a1", moment()).await.unwrap();
        assert_eq!(outcome, BonusSpendOutcome::Applied { amount: 100 });
    }

    #[tokio::test]
    async fn spend_for_missing_user_is_not_requested() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let outcome = spend_bonus(&db, "u1", 100, "a1", moment()).await.unwrap();
        assert_eq!(outcome, BonusSpendOutcome::NotRequested);
    }

    #[tokio::test]
    async fn manual_debit_checks_the_stored_balance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account(300)]])
            .into_connection();
        let outcome = manual_adjust(&db, "u1", -500, None, moment()).await.unwrap();
        assert_eq!(
            outcome,
            ManualAdjustOutcome::InsufficientBalance {
                requested: 500,
                balance: 300
            }
        );
    }

    #[tokio::test]
    async fn manual_credit_moves_the_balance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account(300)]])
            .append_query_results([vec![account(800)]])
            .append_query_results([vec![ledger_row(BonusTransactionType::Manual, 500)]])
            .into_connection();
        let outcome = manual_adjust(&db, "u1", 500, None, moment()).await.unwrap();
        match outcome {
            ManualAdjustOutcome::Applied {
                balance,
                transaction,
            } => {
                assert_eq!(balance, 800);
                assert_eq!(transaction.amount, 500);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn spend_outcome_serializes_tagged() {
        let json =
            serde_json::to_value(BonusSpendOutcome::SkippedInsufficientBalance {
                requested: 500,
                balance: 300,
            })
            .unwrap();
        assert_eq!(json["outcome"], "skippedInsufficientBalance");
        assert_eq!(json["requested"], 500);
        assert_eq!(json["balance"], 300);
    }
}
