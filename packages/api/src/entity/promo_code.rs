//! `SeaORM` Entity for promo codes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "PromoCode")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    /// Stored uppercase (e.g. "SPRING10")
    #[sea_orm(column_type = "Text", unique)]
    pub code: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_name = "discountType")]
    pub discount_type: super::sea_orm_active_enums::DiscountType,
    /// Percentage (0-100) or fixed amount in currency units
    #[sea_orm(column_name = "discountValue")]
    pub discount_value: i64,
    #[sea_orm(column_name = "startsAt")]
    pub starts_at: DateTime,
    /// None = never expires
    #[sea_orm(column_name = "expiresAt", nullable)]
    pub expires_at: Option<DateTime>,
    /// None = unlimited
    #[sea_orm(column_name = "maxUses", nullable)]
    pub max_uses: Option<i64>,
    #[sea_orm(column_name = "usedCount")]
    pub used_count: i64,
    #[sea_orm(column_name = "isActive")]
    pub is_active: bool,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promo_code_service::Entity")]
    PromoCodeService,
}

impl Related<super::promo_code_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromoCodeService.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
