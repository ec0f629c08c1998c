//! Persistence port used by every service
//!
//! `Repository` implements it over Postgres, `MemoryStore` in process.
//! Multi-entity writes (`record_outcome`, `apply_characteristic_diff`,
//! `insert_template`) are atomic in both.

use crate::db::models::*;
use crate::errors::Result;
use crate::workflow::CharacteristicDiff;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Animal listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalFilter {
    pub listing_status: Option<AnimalListingStatus>,
    /// Lowercase species name
    pub species: Option<String>,
    pub sex: Option<Sex>,
}

/// Application listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub animal_id: Option<Uuid>,
    pub applicant_id: Option<Uuid>,
}

/// Task listing filter. Deleted tasks are skipped unless `include_deleted`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub animal_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
}

impl TaskFilter {
    /// Whether a task passes this filter
    pub fn matches(&self, task: &AnimalTask) -> bool {
        if !self.include_deleted && task.is_deleted() && self.status != Some(TaskStatus::Deleted) {
            return false;
        }
        self.animal_id.map_or(true, |id| task.animal_id == id)
            && self.status.map_or(true, |status| task.status == status)
            && self.assignee_id.map_or(true, |id| task.assignee_id == Some(id))
    }
}

/// Trait for shelter persistence
#[async_trait]
pub trait ShelterStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    // Persons
    async fn insert_person(&self, person: Person) -> Result<Person>;
    async fn find_person(&self, id: Uuid) -> Result<Option<Person>>;

    // Animals
    async fn insert_animal(&self, animal: Animal) -> Result<Animal>;
    async fn find_animal(&self, id: Uuid) -> Result<Option<Animal>>;
    async fn update_animal(&self, animal: Animal) -> Result<Animal>;
    async fn list_animals(&self, filter: &AnimalFilter) -> Result<Vec<Animal>>;
    async fn count_animals(&self, status: AnimalListingStatus) -> Result<u64>;

    // Images
    async fn insert_image(&self, image: AnimalImage) -> Result<AnimalImage>;
    async fn find_image(&self, id: Uuid) -> Result<Option<AnimalImage>>;
    async fn list_images(&self, animal_id: Uuid) -> Result<Vec<AnimalImage>>;
    /// Returns false when no row matched
    async fn delete_image(&self, id: Uuid) -> Result<bool>;

    // Adoption applications
    async fn insert_application(&self, application: AdoptionApplication) -> Result<AdoptionApplication>;
    async fn find_application(&self, id: Uuid) -> Result<Option<AdoptionApplication>>;
    async fn update_application(&self, application: AdoptionApplication) -> Result<AdoptionApplication>;
    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<AdoptionApplication>>;
    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64>;

    // Outcomes
    async fn find_outcome_for_animal(&self, animal_id: Uuid) -> Result<Option<Outcome>>;

    /// Insert the outcome, move its application (if any) from APPROVED to
    /// ADOPTED and archive the animal, all or nothing.
    async fn record_outcome(&self, outcome: Outcome) -> Result<Outcome>;

    // Tasks
    async fn insert_task(&self, task: AnimalTask) -> Result<AnimalTask>;
    async fn find_task(&self, id: Uuid) -> Result<Option<AnimalTask>>;
    async fn update_task(&self, task: AnimalTask) -> Result<AnimalTask>;
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<AnimalTask>>;
    /// Tasks in TODO or IN_PROGRESS
    async fn count_open_tasks(&self) -> Result<u64>;

    // Notes
    async fn insert_note(&self, note: Note) -> Result<Note>;
    async fn find_note(&self, id: Uuid) -> Result<Option<Note>>;
    async fn update_note(&self, note: Note) -> Result<Note>;
    async fn list_notes(&self, animal_id: Uuid, include_deleted: bool) -> Result<Vec<Note>>;

    // Characteristics
    async fn insert_characteristic(&self, characteristic: Characteristic) -> Result<Characteristic>;
    async fn find_characteristic_by_name(&self, name: &str) -> Result<Option<Characteristic>>;
    async fn list_characteristics(&self) -> Result<Vec<Characteristic>>;
    async fn characteristics_for_animal(&self, animal_id: Uuid) -> Result<Vec<Characteristic>>;
    async fn apply_characteristic_diff(&self, animal_id: Uuid, diff: &CharacteristicDiff) -> Result<()>;

    // Likes
    /// Returns false when the like already existed
    async fn insert_like(&self, like: PetLike) -> Result<bool>;
    /// Returns false when there was nothing to remove
    async fn delete_like(&self, animal_id: Uuid, person_id: Uuid) -> Result<bool>;
    async fn list_likes(&self, person_id: Uuid) -> Result<Vec<PetLike>>;

    // Assessments
    async fn insert_template(
        &self,
        template: AssessmentTemplate,
        fields: Vec<TemplateField>,
    ) -> Result<(AssessmentTemplate, Vec<TemplateField>)>;
    async fn find_template(&self, id: Uuid) -> Result<Option<(AssessmentTemplate, Vec<TemplateField>)>>;
    async fn list_templates(&self) -> Result<Vec<AssessmentTemplate>>;
    async fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment>;
    async fn list_assessments(&self, animal_id: Uuid) -> Result<Vec<Assessment>>;
}
