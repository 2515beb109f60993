//! `SeaORM` Entity for specialist reviews

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Review")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "userId", column_type = "Text", nullable)]
    pub user_id: Option<String>,
    #[sea_orm(column_name = "specialistId", column_type = "Text")]
    pub specialist_id: String,
    #[sea_orm(column_name = "authorName", column_type = "Text")]
    pub author_name: String,
    /// 1..=5
    pub rating: i32,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    /// Admin reply shown under the review
    #[sea_orm(column_type = "Text", nullable)]
    pub reply: Option<String>,
    #[sea_orm(column_name = "isPublished")]
    pub is_published: bool,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
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
}

impl Related<super::specialist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Specialist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
