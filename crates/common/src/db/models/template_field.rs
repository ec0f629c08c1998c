//! Ordered, typed field of an assessment template

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::FieldType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "template_fields")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub template_id: Uuid,

    pub position: i32,

    #[sea_orm(column_type = "Text")]
    pub label: String,

    pub field_type: FieldType,

    pub required: bool,

    /// JSON array of allowed values for SELECT fields
    #[sea_orm(column_type = "JsonBinary")]
    pub options: serde_json::Value,
}

impl Model {
    /// Allowed values for a SELECT field
    pub fn option_values(&self) -> Vec<String> {
        self.options
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assessment_template::Entity",
        from = "Column::TemplateId",
        to = "super::assessment_template::Column::Id",
        on_delete = "Cascade"
    )]
    Template,
}

impl Related<super::assessment_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
