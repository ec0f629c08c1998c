//! Staff notes on animals. Deletion is soft and reversible.

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, STAFF_ROLES};
use crate::cache::{Revalidate, ViewTag};
use crate::db::models::Note;
use crate::db::ShelterStore;
use crate::errors::{AppError, Result};
use crate::forms::{validate_form, NoteForm};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
}

impl NoteService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>) -> Self {
        Self { store, revalidator }
    }

    /// Load a note of `animal_id` the caller may edit: the author, or any admin
    async fn load_editable(&self, session: &SessionContext, animal_id: Uuid, note_id: Uuid) -> Result<Note> {
        let note = self
            .store
            .find_note(note_id)
            .await?
            .filter(|n| n.animal_id == animal_id)
            .ok_or_else(|| AppError::not_found("note", note_id))?;

        if note.author_id != session.person_id && !session.is_admin() {
            return Err(AppError::access_denied());
        }
        Ok(note)
    }

    async fn save(&self, mut note: Note) -> Result<Note> {
        note.updated_at = now();
        let note = self.store.update_note(note).await?;
        self.revalidator.revalidate(&[ViewTag::AnimalNotes(note.animal_id)]).await;
        Ok(note)
    }

    pub async fn create_note(&self, session: Option<&SessionContext>, animal_id: Uuid, form: NoteForm) -> Result<Note> {
        let session = require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;
        require_animal(self.store.as_ref(), animal_id).await?;

        let ts = now();
        let note = self
            .store
            .insert_note(Note {
                id: Uuid::new_v4(),
                animal_id,
                author_id: session.person_id,
                category: form.category,
                content: form.content.trim().to_string(),
                is_deleted: false,
                created_at: ts,
                updated_at: ts,
            })
            .await?;

        info!(note_id = %note.id, animal_id = %animal_id, "Note added");
        self.revalidator.revalidate(&[ViewTag::AnimalNotes(animal_id)]).await;
        Ok(note)
    }

    pub async fn update_note(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        note_id: Uuid,
        form: NoteForm,
    ) -> Result<Note> {
        let session = require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;

        let mut note = self.load_editable(session, animal_id, note_id).await?;
        if note.is_deleted {
            return Err(AppError::not_found("note", note_id));
        }
        note.category = form.category;
        note.content = form.content.trim().to_string();

        self.save(note).await
    }

    pub async fn delete_note(&self, session: Option<&SessionContext>, animal_id: Uuid, note_id: Uuid) -> Result<Note> {
        let session = require_roles(session, STAFF_ROLES)?;
        let mut note = self.load_editable(session, animal_id, note_id).await?;
        note.is_deleted = true;
        self.save(note).await
    }

    pub async fn restore_note(&self, session: Option<&SessionContext>, animal_id: Uuid, note_id: Uuid) -> Result<Note> {
        let session = require_roles(session, STAFF_ROLES)?;
        let mut note = self.load_editable(session, animal_id, note_id).await?;
        note.is_deleted = false;
        self.save(note).await
    }

    pub async fn list_notes(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Note>> {
        require_roles(session, STAFF_ROLES)?;
        self.store.list_notes(animal_id, include_deleted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AnimalListingStatus, NoteCategory, Role};
    use crate::services::testing::Harness;
    use tokio_test::{assert_err, assert_ok};

    fn note(content: &str) -> NoteForm {
        NoteForm { category: NoteCategory::Behavioral, content: content.into() }
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;

        let created = assert_ok!(h.services.notes.create_note(Some(&staff), animal.id, note("Shy with men")).await);
        h.services.notes.delete_note(Some(&staff), animal.id, created.id).await.unwrap();

        assert!(h.services.notes.list_notes(Some(&staff), animal.id, false).await.unwrap().is_empty());
        assert_eq!(h.services.notes.list_notes(Some(&staff), animal.id, true).await.unwrap().len(), 1);

        let restored = assert_ok!(h.services.notes.restore_note(Some(&staff), animal.id, created.id).await);
        assert!(!restored.is_deleted);
        assert_eq!(h.services.notes.list_notes(Some(&staff), animal.id, false).await.unwrap().len(), 1);
        assert!(h.revalidator.take().iter().all(|t| *t == ViewTag::AnimalNotes(animal.id)));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_edits() {
        let h = Harness::new();
        let author = h.person(Role::Staff).await;
        let colleague = h.person(Role::Staff).await;
        let admin = h.person(Role::Admin).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;
        let created = h.services.notes.create_note(Some(&author), animal.id, note("Eats slowly")).await.unwrap();

        let err = h
            .services
            .notes
            .update_note(Some(&colleague), animal.id, created.id, note("Changed"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let edited = assert_ok!(
            h.services.notes.update_note(Some(&admin), animal.id, created.id, note("Eats very slowly")).await
        );
        assert_eq!(edited.content, "Eats very slowly");
        assert_eq!(edited.author_id, author.person_id);
    }

    #[tokio::test]
    async fn test_empty_note_is_rejected() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;

        let err = h.services.notes.create_note(Some(&staff), animal.id, note("")).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("content"));
        assert_err!(h.services.notes.create_note(Some(&staff), Uuid::new_v4(), note("x")).await);
    }
}
