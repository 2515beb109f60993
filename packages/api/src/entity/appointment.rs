//! `SeaORM` Entity for appointments

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Appointment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "specialistId", column_type = "Text")]
    pub specialist_id: String,
    #[sea_orm(column_name = "serviceId", column_type = "Text", nullable)]
    pub service_id: Option<String>,
    /// Absent for guest bookings; guest contact fields are always filled
    #[sea_orm(column_name = "userId", column_type = "Text", nullable)]
    pub user_id: Option<String>,
    #[sea_orm(column_name = "userName", column_type = "Text")]
    pub user_name: String,
    #[sea_orm(column_name = "userEmail", column_type = "Text")]
    pub user_email: String,
    #[sea_orm(column_name = "userPhone", column_type = "Text")]
    pub user_phone: String,
    pub date: Date,
    /// "HH:MM"
    #[sea_orm(column_name = "timeStart", column_type = "Text")]
    pub time_start: String,
    #[sea_orm(column_name = "timeEnd", column_type = "Text")]
    pub time_end: String,
    pub status: super::sea_orm_active_enums::AppointmentStatus,
    /// Final price after discount and bonus spend
    pub price: i64,
    #[sea_orm(column_name = "originalPrice")]
    pub original_price: i64,
    #[sea_orm(column_name = "discountAmount")]
    pub discount_amount: i64,
    /// Snapshot of the redeemed code, kept even if the promo is later deleted
    #[sea_orm(column_name = "promoCode", column_type = "Text", nullable)]
    pub promo_code: Option<String>,
    #[sea_orm(column_name = "bonusSpent")]
    pub bonus_spent: i64,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::specialist::Entity",
        from = "Column::SpecialistId",
        to = "super::specialist::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Specialist,
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Service,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    User,
    #[sea_orm(has_many = "super::bonus_transaction::Entity")]
    BonusTransaction,
}

impl Related<super::specialist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Specialist.def()
    }
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
