//! `SeaORM` Entity for users

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "User")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "Text", unique)]
    pub email: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,
    pub role: super::sea_orm_active_enums::UserRole,
    /// Derived scalar kept in sync with completed bonus transactions
    #[sea_orm(column_name = "bonusBalance")]
    pub bonus_balance: i64,
    /// 8 uppercase hex chars, generated lazily on first bonus access
    #[sea_orm(column_name = "referralCode", column_type = "Text", nullable, unique)]
    pub referral_code: Option<String>,
    #[sea_orm(column_name = "referredBy", column_type = "Text", nullable)]
    pub referred_by: Option<String>,
    #[sea_orm(column_name = "telegramId", column_type = "Text", nullable)]
    pub telegram_id: Option<String>,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ReferredBy",
        to = "Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Referrer,
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointment,
    #[sea_orm(has_many = "super::bonus_transaction::Entity")]
    BonusTransaction,
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointment.def()
    }
}

impl Related<super::bonus_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BonusTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
