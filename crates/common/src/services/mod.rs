//! Shelter business operations
//!
//! Every entry point takes the caller's session explicitly, checks roles,
//! validates its form, goes through the `ShelterStore` port and finally
//! revalidates the views it touched.

mod animals;
mod applications;
mod assessments;
mod characteristics;
mod likes;
mod notes;
mod outcomes;
mod tasks;

pub use animals::{AnimalDetail, AnimalService, DashboardSummary};
pub use applications::ApplicationService;
pub use assessments::{AssessmentService, TemplateView};
pub use characteristics::{Catalog, CharacteristicService};
pub use likes::{LikeOutcome, LikeService, UnlikeOutcome};
pub use notes::NoteService;
pub use outcomes::OutcomeService;
pub use tasks::TaskService;

use crate::cache::{Cache, Revalidate};
use crate::db::models::Animal;
use crate::db::ShelterStore;
use crate::errors::{AppError, Result};
use crate::storage::ImageStore;
use sea_orm::prelude::DateTimeWithTimeZone;
use std::sync::Arc;
use uuid::Uuid;

/// All services, sharing one store and revalidator
#[derive(Clone)]
pub struct Services {
    pub animals: AnimalService,
    pub applications: ApplicationService,
    pub assessments: AssessmentService,
    pub characteristics: CharacteristicService,
    pub likes: LikeService,
    pub notes: NoteService,
    pub outcomes: OutcomeService,
    pub tasks: TaskService,
    store: Arc<dyn ShelterStore>,
}

impl Services {
    pub fn new(
        store: Arc<dyn ShelterStore>,
        revalidator: Arc<dyn Revalidate>,
        cache: Option<Arc<Cache>>,
        images: ImageStore,
    ) -> Self {
        Self {
            animals: AnimalService::new(store.clone(), revalidator.clone(), cache.clone(), images),
            applications: ApplicationService::new(store.clone(), revalidator.clone()),
            assessments: AssessmentService::new(store.clone(), revalidator.clone()),
            characteristics: CharacteristicService::new(store.clone(), revalidator.clone(), cache),
            likes: LikeService::new(store.clone(), revalidator.clone()),
            notes: NoteService::new(store.clone(), revalidator.clone()),
            outcomes: OutcomeService::new(store.clone(), revalidator.clone()),
            tasks: TaskService::new(store.clone(), revalidator),
            store,
        }
    }

    /// The persistence port, for health checks
    pub fn store(&self) -> &Arc<dyn ShelterStore> {
        &self.store
    }
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

/// Load an animal or fail with `NotFound`
pub(crate) async fn require_animal(store: &dyn ShelterStore, id: Uuid) -> Result<Animal> {
    store
        .find_animal(id)
        .await?
        .ok_or_else(|| AppError::not_found("animal", id))
}
