//! Animal records, images, public browsing and the staff dashboard

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, STAFF_ROLES};
use crate::cache::{keys, Cache, Revalidate, ViewTag};
use crate::db::models::{
    Animal, AnimalImage, AnimalListingStatus, ApplicationStatus, Characteristic,
};
use crate::db::{AnimalFilter, ShelterStore};
use crate::errors::{AppError, Result};
use crate::forms::{validate_form, AnimalForm, ListingStatusForm};
use crate::storage::ImageStore;
use futures::future::try_join_all;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Animal with its images and characteristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalDetail {
    #[serde(flatten)]
    pub animal: Animal,
    pub images: Vec<AnimalImage>,
    pub characteristics: Vec<Characteristic>,
}

/// Staff dashboard counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Listing status -> animals
    pub animals: BTreeMap<String, u64>,
    /// Application status -> applications
    pub applications: BTreeMap<String, u64>,
    /// Tasks in TODO or IN_PROGRESS
    pub open_tasks: u64,
}

#[derive(Clone)]
pub struct AnimalService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
    cache: Option<Arc<Cache>>,
    images: ImageStore,
}

impl AnimalService {
    pub fn new(
        store: Arc<dyn ShelterStore>,
        revalidator: Arc<dyn Revalidate>,
        cache: Option<Arc<Cache>>,
        images: ImageStore,
    ) -> Self {
        Self { store, revalidator, cache, images }
    }

    async fn changed(&self, animal_id: Uuid) {
        self.revalidator
            .revalidate(&[ViewTag::Animal(animal_id), ViewTag::PublicPets, ViewTag::Dashboard])
            .await;
    }

    async fn detail(&self, animal: Animal) -> Result<AnimalDetail> {
        let (images, characteristics) = tokio::try_join!(
            self.store.list_images(animal.id),
            self.store.characteristics_for_animal(animal.id),
        )?;
        Ok(AnimalDetail { animal, images, characteristics })
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Intake. New animals start as DRAFT.
    #[instrument(skip(self, session, form), fields(species = %form.species))]
    pub async fn create_animal(&self, session: Option<&SessionContext>, form: AnimalForm) -> Result<Animal> {
        require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;

        let ts = now();
        let animal = self
            .store
            .insert_animal(Animal {
                id: Uuid::new_v4(),
                name: form.name.trim().to_string(),
                species: form.species.trim().to_string(),
                breed: form.breed,
                color: form.color,
                sex: form.sex,
                birth_date: form.birth_date,
                weight_kg: form.weight_kg,
                height_cm: form.height_cm,
                listing_status: AnimalListingStatus::Draft,
                health_status: form.health_status,
                legal_status: form.legal_status,
                location: form.location,
                description: form.description,
                intake_date: form.intake_date.unwrap_or_else(|| ts.date_naive()),
                created_at: ts,
                updated_at: ts,
            })
            .await?;

        info!(animal_id = %animal.id, "Animal intake recorded");
        self.revalidator.revalidate(&[ViewTag::Dashboard]).await;

        Ok(animal)
    }

    pub async fn update_animal(
        &self,
        session: Option<&SessionContext>,
        id: Uuid,
        form: AnimalForm,
    ) -> Result<Animal> {
        require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;

        let mut animal = require_animal(self.store.as_ref(), id).await?;
        animal.name = form.name.trim().to_string();
        animal.species = form.species.trim().to_string();
        animal.breed = form.breed;
        animal.color = form.color;
        animal.sex = form.sex;
        animal.birth_date = form.birth_date;
        animal.weight_kg = form.weight_kg;
        animal.height_cm = form.height_cm;
        animal.health_status = form.health_status;
        animal.legal_status = form.legal_status;
        animal.location = form.location;
        animal.description = form.description;
        if let Some(intake_date) = form.intake_date {
            animal.intake_date = intake_date;
        }
        animal.updated_at = now();

        let animal = self.store.update_animal(animal).await?;
        self.changed(animal.id).await;
        Ok(animal)
    }

    /// Publish, unpublish or hold. ARCHIVED is reserved for outcomes.
    pub async fn set_listing_status(
        &self,
        session: Option<&SessionContext>,
        id: Uuid,
        form: ListingStatusForm,
    ) -> Result<Animal> {
        require_roles(session, STAFF_ROLES)?;
        if form.listing_status == AnimalListingStatus::Archived {
            return Err(AppError::field(
                "listing_status",
                "Animals are archived by recording an outcome",
            ));
        }

        let mut animal = require_animal(self.store.as_ref(), id).await?;
        if animal.is_archived() {
            return Err(AppError::InvalidTransition {
                entity: "animal",
                from: animal.listing_status.to_string(),
                to: form.listing_status.to_string(),
            });
        }

        let from = animal.listing_status;
        animal.listing_status = form.listing_status;
        animal.updated_at = now();
        let animal = self.store.update_animal(animal).await?;

        info!(animal_id = %animal.id, from = %from, to = %animal.listing_status, "Listing status changed");
        self.changed(animal.id).await;
        Ok(animal)
    }

    /// Staff detail view
    pub async fn get_animal(&self, session: Option<&SessionContext>, id: Uuid) -> Result<AnimalDetail> {
        require_roles(session, STAFF_ROLES)?;
        let animal = require_animal(self.store.as_ref(), id).await?;
        self.detail(animal).await
    }

    // ========================================================================
    // Public site
    // ========================================================================

    /// Published animals, memoized per filter
    pub async fn browse_published(&self, mut filter: AnimalFilter) -> Result<Vec<Animal>> {
        filter.listing_status = Some(AnimalListingStatus::Published);
        filter.species = filter
            .species
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let load = || self.store.list_animals(&filter);
        match &self.cache {
            Some(cache) => {
                let key = keys::view(&ViewTag::PublicPets, &filter);
                cache.get_or_load(&key, "pets", load).await
            }
            None => load().await,
        }
    }

    /// Public detail, hidden unless PUBLISHED or PENDING_ADOPTION
    pub async fn public_detail(&self, id: Uuid) -> Result<AnimalDetail> {
        let load = || async {
            let animal = self
                .store
                .find_animal(id)
                .await?
                .filter(|a| a.listing_status.is_public())
                .ok_or_else(|| AppError::not_found("animal", id))?;
            self.detail(animal).await
        };

        match &self.cache {
            Some(cache) => {
                let key = keys::view(&ViewTag::Animal(id), &"public");
                cache.get_or_load(&key, "animal", load).await
            }
            None => load().await,
        }
    }

    // ========================================================================
    // Images
    // ========================================================================

    #[instrument(skip(self, session, bytes), fields(animal_id = %animal_id, size = bytes.len()))]
    pub async fn add_image(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<AnimalImage> {
        require_roles(session, STAFF_ROLES)?;
        self.images.check(content_type, bytes.len())?;
        require_animal(self.store.as_ref(), animal_id).await?;

        let stored = self.images.save(animal_id, content_type, bytes).await?;
        let image = AnimalImage {
            id: Uuid::new_v4(),
            animal_id,
            url: stored.url,
            file_path: stored.file_path.clone(),
            created_at: now(),
        };

        let image = match self.store.insert_image(image).await {
            Ok(image) => image,
            Err(e) => {
                if let Err(cleanup) = self.images.remove(&stored.file_path).await {
                    warn!(error = %cleanup, "Failed to remove orphaned upload");
                }
                return Err(e);
            }
        };

        info!(image_id = %image.id, "Image added");
        self.changed(animal_id).await;
        Ok(image)
    }

    /// Delete the row, then unlink the file. A missing file is only logged.
    pub async fn delete_image(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        image_id: Uuid,
    ) -> Result<()> {
        require_roles(session, STAFF_ROLES)?;

        let image = self
            .store
            .find_image(image_id)
            .await?
            .filter(|i| i.animal_id == animal_id)
            .ok_or_else(|| AppError::not_found("image", image_id))?;

        if !self.store.delete_image(image.id).await? {
            return Err(AppError::not_found("image", image_id));
        }

        if let Err(e) = self.images.remove(&image.file_path).await {
            warn!(error = %e, path = %image.file_path, "Image row deleted but file removal failed");
        }

        info!(image_id = %image_id, "Image deleted");
        self.changed(animal_id).await;
        Ok(())
    }

    // ========================================================================
    // Dashboard
    // ========================================================================

    pub async fn dashboard_summary(&self, session: Option<&SessionContext>) -> Result<DashboardSummary> {
        require_roles(session, STAFF_ROLES)?;

        let load = || async {
            let animal_counts = try_join_all(
                AnimalListingStatus::iter().map(|s| async move { Ok::<_, AppError>((s, self.store.count_animals(s).await?)) }),
            );
            let application_counts = try_join_all(
                ApplicationStatus::iter()
                    .map(|s| async move { Ok::<_, AppError>((s, self.store.count_applications(s).await?)) }),
            );
            let (animals, applications, open_tasks) =
                tokio::try_join!(animal_counts, application_counts, self.store.count_open_tasks())?;

            Ok(DashboardSummary {
                animals: animals.into_iter().map(|(s, n)| (s.to_string(), n)).collect(),
                applications: applications.into_iter().map(|(s, n)| (s.to_string(), n)).collect(),
                open_tasks,
            })
        };

        match &self.cache {
            Some(cache) => {
                let key = keys::view(&ViewTag::Dashboard, &"summary");
                cache.get_or_load(&key, "dashboard", load).await
            }
            None => load().await,
        }
    }
}
