//! Note entity: freeform, soft-deletable annotation on an animal

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::NoteCategory;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub animal_id: Uuid,

    pub author_id: Uuid,

    pub category: NoteCategory,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(default_value = false)]
    pub is_deleted: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::animal::Entity",
        from = "Column::AnimalId",
        to = "super::animal::Column::Id",
        on_delete = "Cascade"
    )]
    Animal,
}

impl Related<super::animal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Animal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
