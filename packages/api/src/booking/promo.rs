use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};

use crate::entity::{promo_code, promo_code_service, sea_orm_active_enums::DiscountType};

/// Result of resolving a promo code against a booking. An invalid, expired,
/// exhausted or inapplicable code never fails the booking; it just applies
/// no discount.
#[derive(Debug, Clone)]
pub enum PromoOutcome {
    Applied {
        promo: promo_code::Model,
        discount_amount: i64,
        final_price: i64,
    },
    NotApplied,
}

/// Percentage: `price * value / 100`. Fixed: `value`. Clamped to `[0, price]`.
pub fn compute_discount(discount_type: DiscountType, value: i64, price: i64) -> i64 {
    let raw = match discount_type {
        DiscountType::Percentage => price * value / 100,
        DiscountType::Fixed => value,
    };
    raw.clamp(0, price)
}

/// Active flag, validity window and usage cap. The expiry bound is
/// inclusive: a code stays redeemable through its exact `expires_at`
/// instant. Service applicability is checked separately against the join
/// table.
pub fn promo_is_valid(promo: &promo_code::Model, now: NaiveDateTime) -> bool {
    promo.is_active
        && promo.starts_at <= now
        && promo.expires_at.map(|e| e >= now).unwrap_or(true)
        && promo.max_uses.map(|m| promo.used_count < m).unwrap_or(true)
}

/// Looks up a code and computes the discount for the given service and price.
/// Read-only; the usage counter is incremented by [`redeem`] inside the
/// booking transaction.
pub async fn resolve_promo<C: ConnectionTrait>(
    db: &C,
    code: &str,
    service_id: Option<&str>,
    price: i64,
    now: NaiveDateTime,
) -> Result<PromoOutcome, sea_orm::DbErr> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Ok(PromoOutcome::NotApplied);
    }

    let Some(promo) = promo_code::Entity::find()
        .filter(promo_code::Column::Code.eq(&code))
        .one(db)
        .await?
    else {
        tracing::debug!(code = %code, "Promo code not found");
        return Ok(PromoOutcome::NotApplied);
    };

    if !promo_is_valid(&promo, now) {
        tracing::debug!(code = %code, "Promo code outside validity window or exhausted");
        return Ok(PromoOutcome::NotApplied);
    }

    // No restriction rows means the promo applies to every service.
    let restrictions = promo_code_service::Entity::find()
        .filter(promo_code_service::Column::PromoCodeId.eq(&promo.id))
        .all(db)
        .await?;

    if !restrictions.is_empty() {
        let applicable = service_id
            .map(|sid| restrictions.iter().any(|r| r.service_id == sid))
            .unwrap_or(false);
        if !applicable {
            tracing::debug!(code = %code, "Promo code not applicable to this service");
            return Ok(PromoOutcome::NotApplied);
        }
    }

    let discount_amount = compute_discount(promo.discount_type, promo.discount_value, price);
    let final_price = price - discount_amount;

    Ok(PromoOutcome::Applied {
        promo,
        discount_amount,
        final_price,
    })
}

/// Increments the usage counter. Runs on the booking transaction so a failed
/// appointment insert also rolls the counter back.
pub async fn redeem<C: ConnectionTrait>(
    db: &C,
    promo: promo_code::Model,
    now: NaiveDateTime,
) -> Result<(), sea_orm::DbErr> {
    let used = promo.used_count + 1;
    let mut active: promo_code::ActiveModel = promo.into();
    active.used_count = Set(used);
    active.updated_at = Set(now);
    active.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn promo(discount_type: DiscountType, value: i64) -> promo_code::Model {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        promo_code::Model {
            id: "p1".into(),
            code: "TEST".into(),
            description: None,
            discount_type,
            discount_value: value,
            starts_at: day,
            expires_at: None,
            max_uses: None,
            used_count: 0,
            is_active: true,
            created_at: day,
            updated_at: day,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn percentage_discount() {
        // Booking a 2000 service with 10% off: final 1800, discount 200.
        let d = compute_discount(DiscountType::Percentage, 10, 2000);
        assert_eq!(d, 200);
        assert_eq!(2000 - d, 1800);
    }

    #[test]
    fn fixed_discount() {
        assert_eq!(compute_discount(DiscountType::Fixed, 500, 2000), 500);
    }

    #[test]
    fn discount_never_exceeds_price() {
        assert_eq!(compute_discount(DiscountType::Fixed, 5000, 2000), 2000);
        assert_eq!(compute_discount(DiscountType::Percentage, 150, 2000), 2000);
    }

    #[test]
    fn discount_never_negative() {
        assert_eq!(compute_discount(DiscountType::Fixed, -100, 2000), 0);
        assert_eq!(compute_discount(DiscountType::Percentage, -10, 2000), 0);
    }

    #[test]
    fn validity_window() {
        let mut p = promo(DiscountType::Percentage, 10);
        assert!(promo_is_valid(&p, at(2025, 6, 1)));

        p.expires_at = Some(at(2025, 3, 1));
        assert!(!promo_is_valid(&p, at(2025, 6, 1)));
        assert!(promo_is_valid(&p, at(2025, 2, 1)));
        // Still redeemable at the exact expiry instant.
        assert!(promo_is_valid(&p, at(2025, 3, 1)));

        // Not started yet.
        assert!(!promo_is_valid(&p, at(2024, 12, 1)));
    }

    #[test]
    fn usage_cap() {
        let mut p = promo(DiscountType::Fixed, 100);
        p.max_uses = Some(3);
        p.used_count = 2;
        assert!(promo_is_valid(&p, at(2025, 6, 1)));
        p.used_count = 3;
        assert!(!promo_is_valid(&p, at(2025, 6, 1)));
    }

    #[test]
    fn inactive_promo_invalid() {
        let mut p = promo(DiscountType::Fixed, 100);
        p.is_active = false;
        assert!(!promo_is_valid(&p, at(2025, 6, 1)));
    }
}
