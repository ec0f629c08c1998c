//! Assessment template and assessment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::ActionInput;
use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::{Assessment, AssessmentTemplate},
    errors::Result,
    forms::{AssessmentForm, TemplateForm},
    services::TemplateView,
};

pub async fn create_template(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    ActionInput(form): ActionInput<TemplateForm>,
) -> Result<Action<TemplateView>> {
    let result = state.services.assessments.create_template(session.as_ref(), form).await;
    settle(result, StatusCode::CREATED, "Template created")
}

pub async fn list_templates(
    State(state): State<AppState>,
    session: Option<SessionContext>,
) -> Result<Json<Vec<AssessmentTemplate>>> {
    Ok(Json(state.services.assessments.list_templates(session.as_ref()).await?))
}

pub async fn get_template(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateView>> {
    Ok(Json(state.services.assessments.get_template(session.as_ref(), id).await?))
}

/// Record a completed assessment. Answers are keyed by template field id.
pub async fn create_assessment(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
    ActionInput(form): ActionInput<AssessmentForm>,
) -> Result<Action<Assessment>> {
    let result = state
        .services
        .assessments
        .create_assessment(session.as_ref(), animal_id, form)
        .await;
    settle(result, StatusCode::CREATED, "Assessment recorded")
}

pub async fn list_assessments(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<Vec<Assessment>>> {
    Ok(Json(state.services.assessments.list_assessments(session.as_ref(), animal_id).await?))
}
