//! Assessment entity: one dated instantiation of a template for an animal

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::AssessmentRating;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assessments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub animal_id: Uuid,

    pub template_id: Uuid,

    pub assessor_id: Uuid,

    pub assessed_on: Date,

    pub rating: AssessmentRating,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    /// Answers keyed by template field id
    #[sea_orm(column_type = "JsonBinary")]
    pub answers: serde_json::Value,

    pub created_at: DateTimeWithTimeZone,
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

    #[sea_orm(
        belongs_to = "super::assessment_template::Entity",
        from = "Column::TemplateId",
        to = "super::assessment_template::Column::Id"
    )]
    Template,
}

impl Related<super::animal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Animal.def()
    }
}

impl Related<super::assessment_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
