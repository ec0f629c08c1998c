//! Repository pattern for database operations
//!
//! Postgres implementation of `ShelterStore` over SeaORM. Reads go to the
//! replica when one is configured; writes and transactions use the primary.

use super::store::{AnimalFilter, ApplicationFilter, ShelterStore, TaskFilter};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::workflow::CharacteristicDiff;
use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Full-row update errors: a missing row is `NotFound`
fn update_err(err: DbErr, resource: &str, id: Uuid) -> AppError {
    match err {
        DbErr::RecordNotUpdated => AppError::not_found(resource, id),
        other => other.into(),
    }
}

#[async_trait]
impl ShelterStore for Repository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Persons
    // ========================================================================

    async fn insert_person(&self, person: Person) -> Result<Person> {
        let email = person.email.clone();
        person
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict {
                        message: format!("A person with email {} already exists", email),
                    }
                } else {
                    e.into()
                }
            })
    }

    async fn find_person(&self, id: Uuid) -> Result<Option<Person>> {
        PersonEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Animals
    // ========================================================================

    async fn insert_animal(&self, animal: Animal) -> Result<Animal> {
        animal
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_animal(&self, id: Uuid) -> Result<Option<Animal>> {
        AnimalEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_animal(&self, animal: Animal) -> Result<Animal> {
        let id = animal.id;
        animal
            .into_active_model()
            .reset_all()
            .update(self.write_conn())
            .await
            .map_err(|e| update_err(e, "animal", id))
    }

    async fn list_animals(&self, filter: &AnimalFilter) -> Result<Vec<Animal>> {
        let mut query = AnimalEntity::find();
        if let Some(status) = filter.listing_status {
            query = query.filter(AnimalColumn::ListingStatus.eq(status));
        }
        if let Some(species) = filter.species.as_deref() {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(AnimalColumn::Species))).eq(species.to_lowercase()),
            );
        }
        if let Some(sex) = filter.sex {
            query = query.filter(AnimalColumn::Sex.eq(sex));
        }

        query
            .order_by_desc(AnimalColumn::CreatedAt)
            .order_by_asc(AnimalColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn count_animals(&self, status: AnimalListingStatus) -> Result<u64> {
        AnimalEntity::find()
            .filter(AnimalColumn::ListingStatus.eq(status))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Images
    // ========================================================================

    async fn insert_image(&self, image: AnimalImage) -> Result<AnimalImage> {
        let animal_id = image.animal_id;
        image
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::not_found("animal", animal_id)
                } else {
                    e.into()
                }
            })
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<AnimalImage>> {
        AnimalImageEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_images(&self, animal_id: Uuid) -> Result<Vec<AnimalImage>> {
        AnimalImageEntity::find()
            .filter(AnimalImageColumn::AnimalId.eq(animal_id))
            .order_by_asc(AnimalImageColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool> {
        let result = AnimalImageEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Adoption applications
    // ========================================================================

    async fn insert_application(&self, application: AdoptionApplication) -> Result<AdoptionApplication> {
        application
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<AdoptionApplication>> {
        ApplicationEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_application(&self, application: AdoptionApplication) -> Result<AdoptionApplication> {
        let id = application.id;
        application
            .into_active_model()
            .reset_all()
            .update(self.write_conn())
            .await
            .map_err(|e| update_err(e, "application", id))
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<AdoptionApplication>> {
        let mut query = ApplicationEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(ApplicationColumn::Status.eq(status));
        }
        if let Some(animal_id) = filter.animal_id {
            query = query.filter(ApplicationColumn::AnimalId.eq(animal_id));
        }
        if let Some(applicant_id) = filter.applicant_id {
            query = query.filter(ApplicationColumn::ApplicantId.eq(applicant_id));
        }

        query
            .order_by_desc(ApplicationColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64> {
        ApplicationEntity::find()
            .filter(ApplicationColumn::Status.eq(status))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    async fn find_outcome_for_animal(&self, animal_id: Uuid) -> Result<Option<Outcome>> {
        OutcomeEntity::find()
            .filter(OutcomeColumn::AnimalId.eq(animal_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn record_outcome(&self, outcome: Outcome) -> Result<Outcome> {
        let txn = self.write_conn().begin().await?;
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let inserted = outcome
            .clone()
            .into_active_model()
            .reset_all()
            .insert(&txn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict {
                        message: "This animal already has an outcome".to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

        if let Some(application_id) = outcome.application_id {
            // Guarded write: only an APPROVED application for this animal moves.
            let moved = ApplicationEntity::update_many()
                .col_expr(ApplicationColumn::Status, Expr::value(ApplicationStatus::Adopted))
                .col_expr(ApplicationColumn::StatusChangedAt, Expr::value(Some(now)))
                .col_expr(ApplicationColumn::StatusChangedBy, Expr::value(Some(outcome.recorded_by)))
                .col_expr(ApplicationColumn::UpdatedAt, Expr::value(now))
                .filter(ApplicationColumn::Id.eq(application_id))
                .filter(ApplicationColumn::AnimalId.eq(outcome.animal_id))
                .filter(ApplicationColumn::Status.eq(ApplicationStatus::Approved))
                .exec(&txn)
                .await?;

            if moved.rows_affected == 0 {
                txn.rollback().await?;
                return Err(AppError::Conflict {
                    message: "The application is no longer approved".to_string(),
                });
            }
        }

        let archived = AnimalEntity::update_many()
            .col_expr(AnimalColumn::ListingStatus, Expr::value(AnimalListingStatus::Archived))
            .col_expr(AnimalColumn::UpdatedAt, Expr::value(now))
            .filter(AnimalColumn::Id.eq(outcome.animal_id))
            .exec(&txn)
            .await?;

        if archived.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::not_found("animal", outcome.animal_id));
        }

        txn.commit().await?;

        info!(
            animal_id = %inserted.animal_id,
            outcome_type = %inserted.outcome_type,
            "Outcome recorded"
        );

        Ok(inserted)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn insert_task(&self, task: AnimalTask) -> Result<AnimalTask> {
        task.into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<AnimalTask>> {
        TaskEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_task(&self, task: AnimalTask) -> Result<AnimalTask> {
        let id = task.id;
        task.into_active_model()
            .reset_all()
            .update(self.write_conn())
            .await
            .map_err(|e| update_err(e, "task", id))
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<AnimalTask>> {
        let mut query = TaskEntity::find();
        if let Some(animal_id) = filter.animal_id {
            query = query.filter(TaskColumn::AnimalId.eq(animal_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(TaskColumn::Status.eq(status));
        } else if !filter.include_deleted {
            query = query.filter(TaskColumn::Status.ne(TaskStatus::Deleted));
        }
        if let Some(assignee_id) = filter.assignee_id {
            query = query.filter(TaskColumn::AssigneeId.eq(assignee_id));
        }

        query
            .order_by_desc(TaskColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn count_open_tasks(&self) -> Result<u64> {
        TaskEntity::find()
            .filter(TaskColumn::Status.is_in([TaskStatus::Todo, TaskStatus::InProgress]))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Notes
    // ========================================================================

    async fn insert_note(&self, note: Note) -> Result<Note> {
        note.into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_note(&self, id: Uuid) -> Result<Option<Note>> {
        NoteEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_note(&self, note: Note) -> Result<Note> {
        let id = note.id;
        note.into_active_model()
            .reset_all()
            .update(self.write_conn())
            .await
            .map_err(|e| update_err(e, "note", id))
    }

    async fn list_notes(&self, animal_id: Uuid, include_deleted: bool) -> Result<Vec<Note>> {
        let mut query = NoteEntity::find().filter(NoteColumn::AnimalId.eq(animal_id));
        if !include_deleted {
            query = query.filter(NoteColumn::IsDeleted.eq(false));
        }

        query
            .order_by_desc(NoteColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Characteristics
    // ========================================================================

    async fn insert_characteristic(&self, characteristic: Characteristic) -> Result<Characteristic> {
        let name = characteristic.name.clone();
        characteristic
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict {
                        message: format!("Characteristic {} already exists", name),
                    }
                } else {
                    e.into()
                }
            })
    }

    async fn find_characteristic_by_name(&self, name: &str) -> Result<Option<Characteristic>> {
        CharacteristicEntity::find()
            .filter(CharacteristicColumn::Name.eq(name))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_characteristics(&self) -> Result<Vec<Characteristic>> {
        CharacteristicEntity::find()
            .order_by_asc(CharacteristicColumn::Category)
            .order_by_asc(CharacteristicColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn characteristics_for_animal(&self, animal_id: Uuid) -> Result<Vec<Characteristic>> {
        let ids: Vec<Uuid> = AnimalCharacteristicEntity::find()
            .filter(AnimalCharacteristicColumn::AnimalId.eq(animal_id))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|link| link.characteristic_id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        CharacteristicEntity::find()
            .filter(CharacteristicColumn::Id.is_in(ids))
            .order_by_asc(CharacteristicColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn apply_characteristic_diff(&self, animal_id: Uuid, diff: &CharacteristicDiff) -> Result<()> {
        if diff.is_empty() {
            return Ok(());
        }

        let txn = self.write_conn().begin().await?;

        if !diff.to_remove.is_empty() {
            AnimalCharacteristicEntity::delete_many()
                .filter(AnimalCharacteristicColumn::AnimalId.eq(animal_id))
                .filter(AnimalCharacteristicColumn::CharacteristicId.is_in(diff.to_remove.clone()))
                .exec(&txn)
                .await?;
        }

        if !diff.to_add.is_empty() {
            let links = diff.to_add.iter().map(|id| AnimalCharacteristicActiveModel {
                animal_id: Set(animal_id),
                characteristic_id: Set(*id),
            });

            if let Err(e) = AnimalCharacteristicEntity::insert_many(links)
                .exec_without_returning(&txn)
                .await
            {
                txn.rollback().await?;
                return Err(if is_foreign_key_violation(&e) {
                    AppError::field("characteristic_ids", "Unknown characteristic")
                } else {
                    e.into()
                });
            }
        }

        txn.commit().await?;

        debug!(
            animal_id = %animal_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "Characteristics replaced"
        );

        Ok(())
    }

    // ========================================================================
    // Likes
    // ========================================================================

    async fn insert_like(&self, like: PetLike) -> Result<bool> {
        match like.into_active_model().reset_all().insert(self.write_conn()).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_like(&self, animal_id: Uuid, person_id: Uuid) -> Result<bool> {
        let result = PetLikeEntity::delete_many()
            .filter(PetLikeColumn::AnimalId.eq(animal_id))
            .filter(PetLikeColumn::PersonId.eq(person_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn list_likes(&self, person_id: Uuid) -> Result<Vec<PetLike>> {
        PetLikeEntity::find()
            .filter(PetLikeColumn::PersonId.eq(person_id))
            .order_by_desc(PetLikeColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Assessments
    // ========================================================================

    async fn insert_template(
        &self,
        template: AssessmentTemplate,
        mut fields: Vec<TemplateField>,
    ) -> Result<(AssessmentTemplate, Vec<TemplateField>)> {
        fields.sort_by_key(|f| f.position);

        let txn = self.write_conn().begin().await?;

        let template = template.into_active_model().reset_all().insert(&txn).await?;

        if !fields.is_empty() {
            let rows = fields
                .iter()
                .cloned()
                .map(|f| f.into_active_model().reset_all());
            TemplateFieldEntity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;

        Ok((template, fields))
    }

    async fn find_template(&self, id: Uuid) -> Result<Option<(AssessmentTemplate, Vec<TemplateField>)>> {
        let Some(template) = TemplateEntity::find_by_id(id).one(self.read_conn()).await? else {
            return Ok(None);
        };

        let fields = TemplateFieldEntity::find()
            .filter(TemplateFieldColumn::TemplateId.eq(id))
            .order_by_asc(TemplateFieldColumn::Position)
            .all(self.read_conn())
            .await?;

        Ok(Some((template, fields)))
    }

    async fn list_templates(&self) -> Result<Vec<AssessmentTemplate>> {
        TemplateEntity::find()
            .order_by_asc(TemplateColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment> {
        let template_id = assessment.template_id;
        assessment
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::not_found("assessment template", template_id)
                } else {
                    e.into()
                }
            })
    }

    async fn list_assessments(&self, animal_id: Uuid) -> Result<Vec<Assessment>> {
        AssessmentEntity::find()
            .filter(AssessmentColumn::AnimalId.eq(animal_id))
            .order_by_desc(AssessmentColumn::AssessedOn)
            .order_by_desc(AssessmentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
