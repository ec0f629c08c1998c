//! Public adoptable pet listing

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use shelter_common::{
    db::models::{Animal, Sex},
    db::AnimalFilter,
    errors::Result,
    services::AnimalDetail,
};

/// Query string accepted by the public listing
#[derive(Debug, Default, Deserialize)]
pub struct PetQuery {
    pub species: Option<String>,
    pub sex: Option<Sex>,
}

/// Published animals, optionally narrowed by species and sex
pub async fn list_pets(
    State(state): State<AppState>,
    Query(query): Query<PetQuery>,
) -> Result<Json<Vec<Animal>>> {
    let filter = AnimalFilter {
        listing_status: None,
        species: query.species,
        sex: query.sex,
    };
    Ok(Json(state.services.animals.browse_published(filter).await?))
}

/// Detail of one published animal
pub async fn get_pet(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<AnimalDetail>> {
    Ok(Json(state.services.animals.public_detail(id).await?))
}
