//! A person's like on a listed animal

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pet_likes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub animal_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub person_id: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
