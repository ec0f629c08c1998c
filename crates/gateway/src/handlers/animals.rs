//! Staff animal management handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use super::ActionInput;
use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::{Animal, AnimalImage},
    errors::Result,
    forms::{AnimalForm, ListingStatusForm, ReplaceCharacteristicsForm},
    services::AnimalDetail,
    workflow::CharacteristicDiff,
};

pub async fn create_animal(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    ActionInput(form): ActionInput<AnimalForm>,
) -> Result<Action<Animal>> {
    let result = state.services.animals.create_animal(session.as_ref(), form).await;
    settle(result, StatusCode::CREATED, "Animal created")
}

/// Staff view with images and characteristics, any listing status
pub async fn get_animal(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnimalDetail>> {
    Ok(Json(state.services.animals.get_animal(session.as_ref(), id).await?))
}

pub async fn update_animal(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
    ActionInput(form): ActionInput<AnimalForm>,
) -> Result<Action<Animal>> {
    let result = state.services.animals.update_animal(session.as_ref(), id, form).await;
    settle(result, StatusCode::OK, "Animal updated")
}

pub async fn set_listing_status(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
    ActionInput(form): ActionInput<ListingStatusForm>,
) -> Result<Action<Animal>> {
    let result = state.services.animals.set_listing_status(session.as_ref(), id, form).await;
    settle(result, StatusCode::OK, "Listing status updated")
}

/// Raw image upload; the body is the file and `Content-Type` its type
pub async fn upload_image(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Action<AnimalImage>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let result = state
        .services
        .animals
        .add_image(session.as_ref(), id, content_type, &body)
        .await;
    settle(result, StatusCode::CREATED, "Image uploaded")
}

pub async fn delete_image(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<Action<()>> {
    let result = state.services.animals.delete_image(session.as_ref(), id, image_id).await;
    settle(result, StatusCode::OK, "Image deleted")
}

/// Replace the characteristic set of an animal and report what changed
pub async fn replace_characteristics(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
    ActionInput(form): ActionInput<ReplaceCharacteristicsForm>,
) -> Result<Action<CharacteristicDiff>> {
    let result = state
        .services
        .characteristics
        .replace_animal_characteristics(session.as_ref(), id, form)
        .await;
    settle(result, StatusCode::OK, "Characteristics updated")
}
