//! Pet likes. Both directions are idempotent and report whether anything changed.

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, ANY_ROLE};
use crate::cache::{Revalidate, ViewTag};
use crate::db::models::{Animal, PetLike};
use crate::db::ShelterStore;
use crate::errors::{AppError, Result};
use crate::metrics::record_like;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub animal_id: Uuid,
    /// False when the like already existed
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlikeOutcome {
    pub animal_id: Uuid,
    /// False when there was no like to remove
    pub removed: bool,
}

#[derive(Clone)]
pub struct LikeService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
}

impl LikeService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>) -> Self {
        Self { store, revalidator }
    }

    pub async fn create_pet_like(&self, session: Option<&SessionContext>, animal_id: Uuid) -> Result<LikeOutcome> {
        let session = require_roles(session, ANY_ROLE)?;

        let animal = require_animal(self.store.as_ref(), animal_id).await?;
        if !animal.listing_status.is_public() {
            return Err(AppError::not_found("animal", animal_id));
        }

        let created = self
            .store
            .insert_like(PetLike {
                animal_id,
                person_id: session.person_id,
                created_at: now(),
            })
            .await?;

        record_like("create", created);
        if created {
            self.revalidator.revalidate(&[ViewTag::Likes(session.person_id)]).await;
        } else {
            debug!(animal_id = %animal_id, "Like already present");
        }

        Ok(LikeOutcome { animal_id, created })
    }

    pub async fn delete_pet_like(&self, session: Option<&SessionContext>, animal_id: Uuid) -> Result<UnlikeOutcome> {
        let session = require_roles(session, ANY_ROLE)?;

        let removed = self.store.delete_like(animal_id, session.person_id).await?;

        record_like("delete", removed);
        if removed {
            self.revalidator.revalidate(&[ViewTag::Likes(session.person_id)]).await;
        } else {
            debug!(animal_id = %animal_id, "No like to remove");
        }

        Ok(UnlikeOutcome { animal_id, removed })
    }

    /// Animals the caller liked, newest like first. Animals gone since are skipped.
    pub async fn list_liked(&self, session: Option<&SessionContext>) -> Result<Vec<Animal>> {
        let session = require_roles(session, ANY_ROLE)?;

        let likes = self.store.list_likes(session.person_id).await?;
        let animals = try_join_all(likes.iter().map(|like| self.store.find_animal(like.animal_id))).await?;

        Ok(animals.into_iter().flatten().collect())
    }
}
