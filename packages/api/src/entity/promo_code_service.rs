//! `SeaORM` Entity for promo code / service restrictions
//!
//! No rows for a promo means the code applies to every service.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "PromoCodeService")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "promoCodeId", column_type = "Text")]
    pub promo_code_id: String,
    #[sea_orm(primary_key, auto_increment = false, column_name = "serviceId", column_type = "Text")]
    pub service_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promo_code::Entity",
        from = "Column::PromoCodeId",
        to = "super::promo_code::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    PromoCode,
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Service,
}

impl Related<super::promo_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromoCode.def()
    }
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
