//! Characteristic catalog handlers

use axum::{extract::State, http::StatusCode, Json};

use super::ActionInput;
use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::Characteristic,
    errors::Result,
    forms::CharacteristicForm,
    services::Catalog,
};

/// Catalog grouped by category. Public.
pub async fn list_catalog(State(state): State<AppState>) -> Result<Json<Catalog>> {
    Ok(Json(state.services.characteristics.list_catalog().await?))
}

pub async fn create_characteristic(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    ActionInput(form): ActionInput<CharacteristicForm>,
) -> Result<Action<Characteristic>> {
    let result = state
        .services
        .characteristics
        .create_characteristic(session.as_ref(), form)
        .await;
    settle(result, StatusCode::CREATED, "Characteristic created")
}
