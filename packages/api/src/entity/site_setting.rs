//! `SeaORM` Entity for site-wide settings (key/value)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "SiteSetting")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub key: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// New bookings start as PENDING when "true", CONFIRMED otherwise.
pub const REQUIRE_CONFIRMATION: &str = "require_confirmation";
/// Percentage of the paid price accrued as pending booking bonus.
pub const BOOKING_BONUS_PERCENT: &str = "booking_bonus_percent";
/// Flat amount credited to a referrer on the referred user's first completed booking.
pub const REFERRAL_BONUS_AMOUNT: &str = "referral_bonus_amount";
