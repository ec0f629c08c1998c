//! Animal task lifecycle handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::ActionInput;
use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::AnimalTask,
    db::TaskFilter,
    errors::Result,
    forms::{CreateTaskForm, TaskAssigneeForm, TaskStatusForm},
};

/// `?include_deleted=true` on per-animal lists
#[derive(Debug, Default, Deserialize)]
pub struct DeletedQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

pub async fn create_task(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
    ActionInput(form): ActionInput<CreateTaskForm>,
) -> Result<Action<AnimalTask>> {
    let result = state.services.tasks.create_task(session.as_ref(), animal_id, form).await;
    settle(result, StatusCode::CREATED, "Task created")
}

pub async fn list_animal_tasks(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
    Query(query): Query<DeletedQuery>,
) -> Result<Json<Vec<AnimalTask>>> {
    let tasks = state
        .services
        .tasks
        .list_for_animal(session.as_ref(), animal_id, query.include_deleted)
        .await?;
    Ok(Json(tasks))
}

/// Move a task along its lifecycle
pub async fn update_task_status(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((animal_id, task_id)): Path<(Uuid, Uuid)>,
    ActionInput(form): ActionInput<TaskStatusForm>,
) -> Result<Action<AnimalTask>> {
    let result = state
        .services
        .tasks
        .update_task_status(session.as_ref(), animal_id, task_id, form)
        .await;
    settle(result, StatusCode::OK, "Task status updated")
}

pub async fn delete_task(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((animal_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Action<AnimalTask>> {
    let result = state.services.tasks.delete_task(session.as_ref(), animal_id, task_id).await;
    settle(result, StatusCode::OK, "Task deleted")
}

pub async fn restore_task(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((animal_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Action<AnimalTask>> {
    let result = state.services.tasks.restore_task(session.as_ref(), animal_id, task_id).await;
    settle(result, StatusCode::OK, "Task restored")
}

pub async fn update_task_assignee(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(task_id): Path<Uuid>,
    ActionInput(form): ActionInput<TaskAssigneeForm>,
) -> Result<Action<AnimalTask>> {
    let result = state
        .services
        .tasks
        .update_task_assignee(session.as_ref(), task_id, form)
        .await;
    settle(result, StatusCode::OK, "Task reassigned")
}

/// Cross-animal task dashboard
pub async fn task_dashboard(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<AnimalTask>>> {
    Ok(Json(state.services.tasks.dashboard(session.as_ref(), filter).await?))
}
