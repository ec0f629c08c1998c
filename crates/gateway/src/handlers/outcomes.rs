//! Animal outcome handlers

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
    db::models::Outcome,
    errors::Result,
    forms::OutcomeForm,
};

/// Record how an animal left the shelter. Archives the animal and, for an
/// adoption, closes the approved application.
pub async fn create_outcome(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
    ActionInput(form): ActionInput<OutcomeForm>,
) -> Result<Action<Outcome>> {
    let result = state.services.outcomes.create_outcome(session.as_ref(), animal_id, form).await;
    settle(result, StatusCode::CREATED, "Outcome recorded")
}

pub async fn get_outcome(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<Outcome>> {
    Ok(Json(state.services.outcomes.get_outcome(session.as_ref(), animal_id).await?))
}
