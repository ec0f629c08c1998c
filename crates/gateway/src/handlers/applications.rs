//! Adoption application handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::ActionInput;
use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::AdoptionApplication,
    db::ApplicationFilter,
    errors::Result,
    forms::{SubmitApplicationForm, UpdateStatusForm},
};

/// Submit an application for a listed animal
pub async fn submit_application(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    ActionInput(form): ActionInput<SubmitApplicationForm>,
) -> Result<Action<AdoptionApplication>> {
    let result = state.services.applications.submit(session.as_ref(), form).await;
    settle(result, StatusCode::CREATED, "Application submitted")
}

/// Staff see every application, applicants only their own
pub async fn list_applications(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<AdoptionApplication>>> {
    Ok(Json(state.services.applications.list(session.as_ref(), filter).await?))
}

pub async fn get_application(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdoptionApplication>> {
    Ok(Json(state.services.applications.get(session.as_ref(), id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
    ActionInput(form): ActionInput<UpdateStatusForm>,
) -> Result<Action<AdoptionApplication>> {
    let result = state.services.applications.update_status(session.as_ref(), id, form).await;
    settle(result, StatusCode::OK, "Application status updated")
}

pub async fn withdraw(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Action<AdoptionApplication>> {
    let result = state.services.applications.withdraw(session.as_ref(), id).await;
    settle(result, StatusCode::OK, "Application withdrawn")
}

pub async fn reactivate(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Action<AdoptionApplication>> {
    let result = state.services.applications.reactivate(session.as_ref(), id).await;
    settle(result, StatusCode::OK, "Application reactivated")
}
