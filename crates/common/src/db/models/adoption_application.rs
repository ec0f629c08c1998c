//! Adoption application entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{ApplicationStatus, HousingType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "adoption_applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub animal_id: Uuid,

    pub applicant_id: Uuid,

    pub status: ApplicationStatus,

    #[sea_orm(column_type = "Text")]
    pub full_name: String,

    #[sea_orm(column_type = "Text")]
    pub email: String,

    #[sea_orm(column_type = "Text")]
    pub phone: String,

    #[sea_orm(column_type = "Text")]
    pub address: String,

    #[sea_orm(column_type = "Text")]
    pub city: String,

    #[sea_orm(column_type = "Text")]
    pub postal_code: String,

    pub housing_type: HousingType,

    pub owns_home: bool,

    pub landlord_permission: Option<bool>,

    pub household_size: i32,

    pub has_children: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub other_pets: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub experience: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    /// Staff-only notes, never shown to the applicant
    #[sea_orm(column_type = "Text", nullable)]
    pub internal_notes: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub status_change_reason: Option<String>,

    pub status_changed_at: Option<DateTimeWithTimeZone>,

    pub status_changed_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Copy with staff-only fields removed, for the applicant's own view
    pub fn redacted(mut self) -> Self {
        self.internal_notes = None;
        self
    }
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
        belongs_to = "super::person::Entity",
        from = "Column::ApplicantId",
        to = "super::person::Column::Id"
    )]
    Applicant,
}

impl Related<super::animal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Animal.def()
    }
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applicant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
