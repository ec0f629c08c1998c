//! SeaORM entity models
//!
//! Database entities for the shelter service

mod enums;
mod person;
mod animal;
mod animal_image;
mod adoption_application;
mod outcome;
mod animal_task;
mod note;
mod characteristic;
mod animal_characteristic;
mod assessment_template;
mod template_field;
mod assessment;
mod pet_like;

pub use enums::{
    AnimalListingStatus, ApplicationStatus, AssessmentRating, FieldType, HealthStatus,
    HousingType, LegalStatus, NoteCategory, OutcomeType, Role, Sex, TaskCategory,
    TaskPriority, TaskStatus,
};

pub use person::{
    Entity as PersonEntity,
    Model as Person,
    ActiveModel as PersonActiveModel,
    Column as PersonColumn,
};

pub use animal::{
    Entity as AnimalEntity,
    Model as Animal,
    ActiveModel as AnimalActiveModel,
    Column as AnimalColumn,
};

pub use animal_image::{
    Entity as AnimalImageEntity,
    Model as AnimalImage,
    ActiveModel as AnimalImageActiveModel,
    Column as AnimalImageColumn,
};

pub use adoption_application::{
    Entity as ApplicationEntity,
    Model as AdoptionApplication,
    ActiveModel as ApplicationActiveModel,
    Column as ApplicationColumn,
};

pub use outcome::{
    Entity as OutcomeEntity,
    Model as Outcome,
    ActiveModel as OutcomeActiveModel,
    Column as OutcomeColumn,
};

pub use animal_task::{
    Entity as TaskEntity,
    Model as AnimalTask,
    ActiveModel as TaskActiveModel,
    Column as TaskColumn,
};

pub use note::{
    Entity as NoteEntity,
    Model as Note,
    ActiveModel as NoteActiveModel,
    Column as NoteColumn,
};

pub use characteristic::{
    Entity as CharacteristicEntity,
    Model as Characteristic,
    ActiveModel as CharacteristicActiveModel,
    Column as CharacteristicColumn,
};

pub use animal_characteristic::{
    Entity as AnimalCharacteristicEntity,
    Model as AnimalCharacteristic,
    ActiveModel as AnimalCharacteristicActiveModel,
    Column as AnimalCharacteristicColumn,
};

pub use assessment_template::{
    Entity as TemplateEntity,
    Model as AssessmentTemplate,
    ActiveModel as TemplateActiveModel,
    Column as TemplateColumn,
};

pub use template_field::{
    Entity as TemplateFieldEntity,
    Model as TemplateField,
    ActiveModel as TemplateFieldActiveModel,
    Column as TemplateFieldColumn,
};

pub use assessment::{
    Entity as AssessmentEntity,
    Model as Assessment,
    ActiveModel as AssessmentActiveModel,
    Column as AssessmentColumn,
};

pub use pet_like::{
    Entity as PetLikeEntity,
    Model as PetLike,
    ActiveModel as PetLikeActiveModel,
    Column as PetLikeColumn,
};
