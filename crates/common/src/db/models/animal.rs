//! Animal entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{AnimalListingStatus, HealthStatus, LegalStatus, Sex};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "animals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub species: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub breed: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub color: Option<String>,

    pub sex: Sex,

    pub birth_date: Option<Date>,

    pub weight_kg: Option<f64>,

    pub height_cm: Option<f64>,

    pub listing_status: AnimalListingStatus,

    pub health_status: HealthStatus,

    pub legal_status: LegalStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub location: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub intake_date: Date,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Archived animals have left the shelter
    pub fn is_archived(&self) -> bool {
        self.listing_status == AnimalListingStatus::Archived
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::animal_image::Entity")]
    Images,

    #[sea_orm(has_many = "super::animal_task::Entity")]
    Tasks,

    #[sea_orm(has_many = "super::note::Entity")]
    Notes,

    #[sea_orm(has_many = "super::adoption_application::Entity")]
    Applications,
}

impl Related<super::animal_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::animal_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl Related<super::adoption_application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
