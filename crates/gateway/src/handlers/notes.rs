//! Animal note handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{tasks::DeletedQuery, ActionInput};
use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::Note,
    errors::Result,
    forms::NoteForm,
};

pub async fn create_note(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
    ActionInput(form): ActionInput<NoteForm>,
) -> Result<Action<Note>> {
    let result = state.services.notes.create_note(session.as_ref(), animal_id, form).await;
    settle(result, StatusCode::CREATED, "Note added")
}

pub async fn list_notes(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
    Query(query): Query<DeletedQuery>,
) -> Result<Json<Vec<Note>>> {
    let notes = state
        .services
        .notes
        .list_notes(session.as_ref(), animal_id, query.include_deleted)
        .await?;
    Ok(Json(notes))
}

pub async fn update_note(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((animal_id, note_id)): Path<(Uuid, Uuid)>,
    ActionInput(form): ActionInput<NoteForm>,
) -> Result<Action<Note>> {
    let result = state
        .services
        .notes
        .update_note(session.as_ref(), animal_id, note_id, form)
        .await;
    settle(result, StatusCode::OK, "Note updated")
}

/// Soft delete; the note can be restored
pub async fn delete_note(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((animal_id, note_id)): Path<(Uuid, Uuid)>,
) -> Result<Action<Note>> {
    let result = state.services.notes.delete_note(session.as_ref(), animal_id, note_id).await;
    settle(result, StatusCode::OK, "Note deleted")
}

pub async fn restore_note(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((animal_id, note_id)): Path<(Uuid, Uuid)>,
) -> Result<Action<Note>> {
    let result = state.services.notes.restore_note(session.as_ref(), animal_id, note_id).await;
    settle(result, StatusCode::OK, "Note restored")
}
