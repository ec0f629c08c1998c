//! Per-animal task entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{TaskCategory, TaskPriority, TaskStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "animal_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub animal_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,

    pub category: TaskCategory,

    pub priority: TaskPriority,

    pub status: TaskStatus,

    /// Status held before a soft delete, used by restore
    pub previous_status: Option<TaskStatus>,

    pub assignee_id: Option<Uuid>,

    pub due_date: Option<Date>,

    pub created_by: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_deleted(&self) -> bool {
        self.status == TaskStatus::Deleted
    }
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
