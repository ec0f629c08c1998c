//! In-process `ShelterStore`
//!
//! Tables are plain hash maps behind one `RwLock`. Every write takes the
//! write lock for its whole duration, so multi-entity writes are atomic.
//! Unique keys and the outcome guard behave like the Postgres schema.

use super::store::{AnimalFilter, ApplicationFilter, ShelterStore, TaskFilter};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::workflow::CharacteristicDiff;
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    persons: HashMap<Uuid, Person>,
    animals: HashMap<Uuid, Animal>,
    images: HashMap<Uuid, AnimalImage>,
    applications: HashMap<Uuid, AdoptionApplication>,
    /// Keyed by animal id
    outcomes: HashMap<Uuid, Outcome>,
    tasks: HashMap<Uuid, AnimalTask>,
    notes: HashMap<Uuid, Note>,
    characteristics: HashMap<Uuid, Characteristic>,
    /// (animal_id, characteristic_id)
    animal_characteristics: BTreeSet<(Uuid, Uuid)>,
    templates: HashMap<Uuid, AssessmentTemplate>,
    template_fields: HashMap<Uuid, Vec<TemplateField>>,
    assessments: HashMap<Uuid, Assessment>,
    /// (animal_id, person_id)
    likes: HashMap<(Uuid, Uuid), PetLike>,
}

/// Store used by tests and `database.url = "memory://"`
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn replace<T: Clone>(map: &mut HashMap<Uuid, T>, id: Uuid, value: T, resource: &str) -> Result<T> {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = value.clone();
            Ok(value)
        }
        None => Err(AppError::not_found(resource, id)),
    }
}

#[async_trait]
impl ShelterStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Persons
    // ========================================================================

    async fn insert_person(&self, person: Person) -> Result<Person> {
        let mut t = self.tables.write().await;
        if t.persons.values().any(|p| p.email == person.email) {
            return Err(AppError::Conflict {
                message: format!("A person with email {} already exists", person.email),
            });
        }
        t.persons.insert(person.id, person.clone());
        Ok(person)
    }

    async fn find_person(&self, id: Uuid) -> Result<Option<Person>> {
        Ok(self.tables.read().await.persons.get(&id).cloned())
    }

    // ========================================================================
    // Animals
    // ========================================================================

    async fn insert_animal(&self, animal: Animal) -> Result<Animal> {
        self.tables.write().await.animals.insert(animal.id, animal.clone());
        Ok(animal)
    }

    async fn find_animal(&self, id: Uuid) -> Result<Option<Animal>> {
        Ok(self.tables.read().await.animals.get(&id).cloned())
    }

    async fn update_animal(&self, animal: Animal) -> Result<Animal> {
        let mut t = self.tables.write().await;
        replace(&mut t.animals, animal.id, animal, "animal")
    }

    async fn list_animals(&self, filter: &AnimalFilter) -> Result<Vec<Animal>> {
        let t = self.tables.read().await;
        let mut animals: Vec<Animal> = t
            .animals
            .values()
            .filter(|a| filter.listing_status.map_or(true, |s| a.listing_status == s))
            .filter(|a| {
                filter
                    .species
                    .as_deref()
                    .map_or(true, |s| a.species.eq_ignore_ascii_case(s))
            })
            .filter(|a| filter.sex.map_or(true, |s| a.sex == s))
            .cloned()
            .collect();
        animals.sort_by_key(|a| (Reverse(a.created_at), a.id));
        Ok(animals)
    }

    async fn count_animals(&self, status: AnimalListingStatus) -> Result<u64> {
        let t = self.tables.read().await;
        Ok(t.animals.values().filter(|a| a.listing_status == status).count() as u64)
    }

    // ========================================================================
    // Images
    // ========================================================================

    async fn insert_image(&self, image: AnimalImage) -> Result<AnimalImage> {
        let mut t = self.tables.write().await;
        if !t.animals.contains_key(&image.animal_id) {
            return Err(AppError::not_found("animal", image.animal_id));
        }
        t.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<AnimalImage>> {
        Ok(self.tables.read().await.images.get(&id).cloned())
    }

    async fn list_images(&self, animal_id: Uuid) -> Result<Vec<AnimalImage>> {
        let t = self.tables.read().await;
        let mut images: Vec<AnimalImage> = t.images.values().filter(|i| i.animal_id == animal_id).cloned().collect();
        images.sort_by_key(|i| (i.created_at, i.id));
        Ok(images)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.images.remove(&id).is_some())
    }

    // ========================================================================
    // Adoption applications
    // ========================================================================

    async fn insert_application(&self, application: AdoptionApplication) -> Result<AdoptionApplication> {
        self.tables.write().await.applications.insert(application.id, application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<AdoptionApplication>> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn update_application(&self, application: AdoptionApplication) -> Result<AdoptionApplication> {
        let mut t = self.tables.write().await;
        replace(&mut t.applications, application.id, application, "application")
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<AdoptionApplication>> {
        let t = self.tables.read().await;
        let mut apps: Vec<AdoptionApplication> = t
            .applications
            .values()
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| filter.animal_id.map_or(true, |id| a.animal_id == id))
            .filter(|a| filter.applicant_id.map_or(true, |id| a.applicant_id == id))
            .cloned()
            .collect();
        apps.sort_by_key(|a| (Reverse(a.created_at), a.id));
        Ok(apps)
    }

    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64> {
        let t = self.tables.read().await;
        Ok(t.applications.values().filter(|a| a.status == status).count() as u64)
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    async fn find_outcome_for_animal(&self, animal_id: Uuid) -> Result<Option<Outcome>> {
        Ok(self.tables.read().await.outcomes.get(&animal_id).cloned())
    }

    async fn record_outcome(&self, outcome: Outcome) -> Result<Outcome> {
        let mut t = self.tables.write().await;

        if t.outcomes.contains_key(&outcome.animal_id) {
            return Err(AppError::Conflict {
                message: "This animal already has an outcome".to_string(),
            });
        }
        if !t.animals.contains_key(&outcome.animal_id) {
            return Err(AppError::not_found("animal", outcome.animal_id));
        }
        if let Some(application_id) = outcome.application_id {
            let approved = t.applications.get(&application_id).is_some_and(|a| {
                a.animal_id == outcome.animal_id && a.status == ApplicationStatus::Approved
            });
            if !approved {
                return Err(AppError::Conflict {
                    message: "The application is no longer approved".to_string(),
                });
            }
        }

        // Checks passed; nothing below can fail.
        let now = Utc::now().into();
        if let Some(app) = outcome.application_id.and_then(|id| t.applications.get_mut(&id)) {
            app.status = ApplicationStatus::Adopted;
            app.status_changed_at = Some(now);
            app.status_changed_by = Some(outcome.recorded_by);
            app.updated_at = now;
        }
        if let Some(animal) = t.animals.get_mut(&outcome.animal_id) {
            animal.listing_status = AnimalListingStatus::Archived;
            animal.updated_at = now;
        }
        t.outcomes.insert(outcome.animal_id, outcome.clone());

        Ok(outcome)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn insert_task(&self, task: AnimalTask) -> Result<AnimalTask> {
        self.tables.write().await.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<AnimalTask>> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: AnimalTask) -> Result<AnimalTask> {
        let mut t = self.tables.write().await;
        replace(&mut t.tasks, task.id, task, "task")
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<AnimalTask>> {
        let t = self.tables.read().await;
        let mut tasks: Vec<AnimalTask> = t.tasks.values().filter(|task| filter.matches(task)).cloned().collect();
        tasks.sort_by_key(|task| (Reverse(task.created_at), task.id));
        Ok(tasks)
    }

    async fn count_open_tasks(&self) -> Result<u64> {
        let t = self.tables.read().await;
        Ok(t.tasks
            .values()
            .filter(|task| matches!(task.status, TaskStatus::Todo | TaskStatus::InProgress))
            .count() as u64)
    }

    // ========================================================================
    // Notes
    // ========================================================================

    async fn insert_note(&self, note: Note) -> Result<Note> {
        self.tables.write().await.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn find_note(&self, id: Uuid) -> Result<Option<Note>> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }

    async fn update_note(&self, note: Note) -> Result<Note> {
        let mut t = self.tables.write().await;
        replace(&mut t.notes, note.id, note, "note")
    }

    async fn list_notes(&self, animal_id: Uuid, include_deleted: bool) -> Result<Vec<Note>> {
        let t = self.tables.read().await;
        let mut notes: Vec<Note> = t
            .notes
            .values()
            .filter(|n| n.animal_id == animal_id && (include_deleted || !n.is_deleted))
            .cloned()
            .collect();
        notes.sort_by_key(|n| (Reverse(n.created_at), n.id));
        Ok(notes)
    }

    // ========================================================================
    // Characteristics
    // ========================================================================

    async fn insert_characteristic(&self, characteristic: Characteristic) -> Result<Characteristic> {
        let mut t = self.tables.write().await;
        if t.characteristics.values().any(|c| c.name == characteristic.name) {
            return Err(AppError::Conflict {
                message: format!("Characteristic {} already exists", characteristic.name),
            });
        }
        t.characteristics.insert(characteristic.id, characteristic.clone());
        Ok(characteristic)
    }

    async fn find_characteristic_by_name(&self, name: &str) -> Result<Option<Characteristic>> {
        let t = self.tables.read().await;
        Ok(t.characteristics.values().find(|c| c.name == name).cloned())
    }

    async fn list_characteristics(&self) -> Result<Vec<Characteristic>> {
        let t = self.tables.read().await;
        let mut all: Vec<Characteristic> = t.characteristics.values().cloned().collect();
        all.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        Ok(all)
    }

    async fn characteristics_for_animal(&self, animal_id: Uuid) -> Result<Vec<Characteristic>> {
        let t = self.tables.read().await;
        let mut assigned: Vec<Characteristic> = t
            .animal_characteristics
            .iter()
            .filter(|(owner, _)| *owner == animal_id)
            .filter_map(|(_, id)| t.characteristics.get(id).cloned())
            .collect();
        assigned.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assigned)
    }

    async fn apply_characteristic_diff(&self, animal_id: Uuid, diff: &CharacteristicDiff) -> Result<()> {
        let mut t = self.tables.write().await;
        if let Some(missing) = diff.to_add.iter().find(|id| !t.characteristics.contains_key(*id)) {
            return Err(AppError::not_found("characteristic", missing));
        }
        for id in &diff.to_remove {
            t.animal_characteristics.remove(&(animal_id, *id));
        }
        for id in &diff.to_add {
            t.animal_characteristics.insert((animal_id, *id));
        }
        Ok(())
    }

    // ========================================================================
    // Likes
    // ========================================================================

    async fn insert_like(&self, like: PetLike) -> Result<bool> {
        let mut t = self.tables.write().await;
        let key = (like.animal_id, like.person_id);
        if t.likes.contains_key(&key) {
            return Ok(false);
        }
        t.likes.insert(key, like);
        Ok(true)
    }

    async fn delete_like(&self, animal_id: Uuid, person_id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.likes.remove(&(animal_id, person_id)).is_some())
    }

    async fn list_likes(&self, person_id: Uuid) -> Result<Vec<PetLike>> {
        let t = self.tables.read().await;
        let mut likes: Vec<PetLike> = t.likes.values().filter(|l| l.person_id == person_id).cloned().collect();
        likes.sort_by_key(|l| (Reverse(l.created_at), l.animal_id));
        Ok(likes)
    }

    // ========================================================================
    // Assessments
    // ========================================================================

    async fn insert_template(
        &self,
        template: AssessmentTemplate,
        mut fields: Vec<TemplateField>,
    ) -> Result<(AssessmentTemplate, Vec<TemplateField>)> {
        let mut t = self.tables.write().await;
        fields.sort_by_key(|f| f.position);
        t.templates.insert(template.id, template.clone());
        t.template_fields.insert(template.id, fields.clone());
        Ok((template, fields))
    }

    async fn find_template(&self, id: Uuid) -> Result<Option<(AssessmentTemplate, Vec<TemplateField>)>> {
        let t = self.tables.read().await;
        Ok(t.templates.get(&id).map(|template| {
            let fields = t.template_fields.get(&id).cloned().unwrap_or_default();
            (template.clone(), fields)
        }))
    }

    async fn list_templates(&self) -> Result<Vec<AssessmentTemplate>> {
        let t = self.tables.read().await;
        let mut templates: Vec<AssessmentTemplate> = t.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment> {
        let mut t = self.tables.write().await;
        if !t.templates.contains_key(&assessment.template_id) {
            return Err(AppError::not_found("assessment template", assessment.template_id));
        }
        t.assessments.insert(assessment.id, assessment.clone());
        Ok(assessment)
    }

    async fn list_assessments(&self, animal_id: Uuid) -> Result<Vec<Assessment>> {
        let t = self.tables.read().await;
        let mut list: Vec<Assessment> = t.assessments.values().filter(|a| a.animal_id == animal_id).cloned().collect();
        list.sort_by_key(|a| (Reverse(a.assessed_on), Reverse(a.created_at)));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tokio_test::{assert_err, assert_ok};

    fn animal(name: &str, status: AnimalListingStatus) -> Animal {
        let now = Utc::now().into();
        Animal {
            id: Uuid::new_v4(),
            name: name.into(),
            species: "Dog".into(),
            breed: None,
            color: None,
            sex: Sex::Male,
            birth_date: None,
            weight_kg: None,
            height_cm: None,
            listing_status: status,
            health_status: HealthStatus::Healthy,
            legal_status: LegalStatus::ShelterOwned,
            location: None,
            description: None,
            intake_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn outcome(animal_id: Uuid, outcome_type: OutcomeType, application_id: Option<Uuid>) -> Outcome {
        Outcome {
            id: Uuid::new_v4(),
            animal_id,
            outcome_type,
            outcome_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            application_id,
            destination: None,
            notes: None,
            recorded_by: Uuid::new_v4(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_list_animals_filters_species_case_insensitively() {
        let store = MemoryStore::new();
        store.insert_animal(animal("Rex", AnimalListingStatus::Published)).await.unwrap();
        store.insert_animal(animal("Draft", AnimalListingStatus::Draft)).await.unwrap();

        let filter = AnimalFilter {
            listing_status: Some(AnimalListingStatus::Published),
            species: Some("dog".into()),
            sex: None,
        };
        let found = store.list_animals(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Rex");
    }

    #[tokio::test]
    async fn test_likes_are_unique_per_person() {
        let store = MemoryStore::new();
        let like = PetLike {
            animal_id: Uuid::new_v4(),
            person_id: Uuid::new_v4(),
            created_at: Utc::now().into(),
        };

        assert!(store.insert_like(like.clone()).await.unwrap());
        assert!(!store.insert_like(like.clone()).await.unwrap());
        assert_eq!(store.list_likes(like.person_id).await.unwrap().len(), 1);

        assert!(store.delete_like(like.animal_id, like.person_id).await.unwrap());
        assert!(!store.delete_like(like.animal_id, like.person_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_outcome_guard_writes_nothing() {
        let store = MemoryStore::new();
        let pet = store.insert_animal(animal("Rex", AnimalListingStatus::PendingAdoption)).await.unwrap();

        let err = store
            .record_outcome(outcome(pet.id, OutcomeType::Adoption, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        assert!(store.find_outcome_for_animal(pet.id).await.unwrap().is_none());
        let pet = store.find_animal(pet.id).await.unwrap().unwrap();
        assert_eq!(pet.listing_status, AnimalListingStatus::PendingAdoption);
    }

    #[tokio::test]
    async fn test_one_outcome_per_animal() {
        let store = MemoryStore::new();
        let pet = store.insert_animal(animal("Rex", AnimalListingStatus::Published)).await.unwrap();

        assert_ok!(store.record_outcome(outcome(pet.id, OutcomeType::Died, None)).await);
        assert_err!(store.record_outcome(outcome(pet.id, OutcomeType::Transfer, None)).await);
        assert!(store.find_animal(pet.id).await.unwrap().unwrap().is_archived());
    }

    #[tokio::test]
    async fn test_characteristic_diff_rejects_unknown_ids() {
        let store = MemoryStore::new();
        let calm = store
            .insert_characteristic(Characteristic {
                id: Uuid::new_v4(),
                name: "Calm".into(),
                category: "Temperament".into(),
                created_at: Utc::now().into(),
            })
            .await
            .unwrap();
        let animal_id = Uuid::new_v4();

        let bad = CharacteristicDiff { to_add: vec![calm.id, Uuid::new_v4()], to_remove: vec![] };
        assert_err!(store.apply_characteristic_diff(animal_id, &bad).await);
        assert!(store.characteristics_for_animal(animal_id).await.unwrap().is_empty());

        let good = CharacteristicDiff { to_add: vec![calm.id], to_remove: vec![] };
        assert_ok!(store.apply_characteristic_diff(animal_id, &good).await);
        assert_eq!(store.characteristics_for_animal(animal_id).await.unwrap(), vec![calm]);
    }
}
