//! Outcome entity: the terminal disposition of an animal

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::OutcomeType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outcomes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// One outcome per animal
    #[sea_orm(unique)]
    pub animal_id: Uuid,

    pub outcome_type: OutcomeType,

    pub outcome_date: Date,

    pub application_id: Option<Uuid>,

    /// Receiving partner for transfers
    #[sea_orm(column_type = "Text", nullable)]
    pub destination: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub recorded_by: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::animal::Entity",
        from = "Column::AnimalId",
        to = "super::animal::Column::Id"
    )]
    Animal,

    #[sea_orm(
        belongs_to = "super::adoption_application::Entity",
        from = "Column::ApplicationId",
        to = "super::adoption_application::Column::Id"
    )]
    Application,
}

impl Related<super::animal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Animal.def()
    }
}

impl Related<super::adoption_application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
