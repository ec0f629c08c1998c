//! Many-to-many assignment of characteristics to animals

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "animal_characteristics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub animal_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub characteristic_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::characteristic::Entity",
        from = "Column::CharacteristicId",
        to = "super::characteristic::Column::Id",
        on_delete = "Cascade"
    )]
    Characteristic,
}

impl Related<super::characteristic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Characteristic.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
