//! Pet like handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::AppState;
use shelter_common::{
    actions::{settle, Action},
    auth::SessionContext,
    db::models::Animal,
    errors::Result,
    services::{LikeOutcome, UnlikeOutcome},
};

/// Like a pet. Liking twice is not an error.
pub async fn like_pet(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Action<LikeOutcome>> {
    let result = state.services.likes.create_pet_like(session.as_ref(), id).await;
    settle(result, StatusCode::OK, "Added to your liked pets")
}

pub async fn unlike_pet(
    State(state): State<AppState>,
    session: Option<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Action<UnlikeOutcome>> {
    let result = state.services.likes.delete_pet_like(session.as_ref(), id).await;
    settle(result, StatusCode::OK, "Removed from your liked pets")
}

/// Animals the caller has liked
pub async fn my_likes(State(state): State<AppState>, session: Option<SessionContext>) -> Result<Json<Vec<Animal>>> {
    Ok(Json(state.services.likes.list_liked(session.as_ref()).await?))
}
