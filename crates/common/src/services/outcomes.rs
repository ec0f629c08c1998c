//! Outcome recording
//!
//! The only path that writes application status ADOPTED and listing status
//! ARCHIVED. The three writes happen in one store transaction.

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, STAFF_ROLES};
use crate::cache::{Revalidate, ViewTag};
use crate::db::models::{ApplicationStatus, Outcome, OutcomeType};
use crate::db::ShelterStore;
use crate::errors::{AppError, Result};
use crate::forms::{validate_form, OutcomeForm};
use crate::metrics::{record_application_transition, record_outcome};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct OutcomeService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
}

impl OutcomeService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>) -> Self {
        Self { store, revalidator }
    }

    /// An adoption must point at an APPROVED application for this animal
    async fn check_application(&self, animal_id: Uuid, application_id: Uuid) -> Result<()> {
        let application = self
            .store
            .find_application(application_id)
            .await?
            .filter(|a| a.animal_id == animal_id)
            .ok_or_else(|| AppError::field("application_id", "No such application for this animal"))?;

        if application.status != ApplicationStatus::Approved {
            return Err(AppError::field(
                "application_id",
                format!("The application is {}, not APPROVED", application.status),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, session, form), fields(animal_id = %animal_id, outcome_type = %form.outcome_type))]
    pub async fn create_outcome(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        form: OutcomeForm,
    ) -> Result<Outcome> {
        let session = require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;

        require_animal(self.store.as_ref(), animal_id).await?;
        if self.store.find_outcome_for_animal(animal_id).await?.is_some() {
            return Err(AppError::Conflict {
                message: "This animal already has an outcome".to_string(),
            });
        }

        let application_id = match form.outcome_type {
            OutcomeType::Adoption => form.application_id,
            _ => None,
        };
        if let Some(application_id) = application_id {
            self.check_application(animal_id, application_id).await?;
        }

        let ts = now();
        let outcome = self
            .store
            .record_outcome(Outcome {
                id: Uuid::new_v4(),
                animal_id,
                outcome_type: form.outcome_type,
                outcome_date: form.outcome_date.unwrap_or_else(|| ts.date_naive()),
                application_id,
                destination: form.destination,
                notes: form.notes,
                recorded_by: session.person_id,
                created_at: ts,
            })
            .await?;

        record_outcome(&outcome.outcome_type.to_string());
        let mut tags = vec![
            ViewTag::Animal(animal_id),
            ViewTag::PublicPets,
            ViewTag::Dashboard,
        ];
        if let Some(application_id) = outcome.application_id {
            record_application_transition(
                &ApplicationStatus::Approved.to_string(),
                &ApplicationStatus::Adopted.to_string(),
            );
            tags.push(ViewTag::Applications);
            tags.push(ViewTag::Application(application_id));
        }

        info!(outcome_id = %outcome.id, "Outcome recorded, animal archived");
        self.revalidator.revalidate(&tags).await;

        Ok(outcome)
    }

    pub async fn get_outcome(&self, session: Option<&SessionContext>, animal_id: Uuid) -> Result<Outcome> {
        require_roles(session, STAFF_ROLES)?;
        self.store
            .find_outcome_for_animal(animal_id)
            .await?
            .ok_or_else(|| AppError::not_found("outcome", animal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AdoptionApplication, Animal, AnimalListingStatus, Role};
    use crate::forms::fixtures::application_form;
    use crate::forms::UpdateStatusForm;
    use crate::services::testing::Harness;
    use tokio_test::assert_ok;

    fn adoption(application_id: Uuid) -> OutcomeForm {
        OutcomeForm {
            outcome_type: OutcomeType::Adoption,
            outcome_date: None,
            application_id: Some(application_id),
            destination: None,
            notes: Some("Went home with a new collar".into()),
        }
    }

    async fn application_in(
        h: &Harness,
        staff: &SessionContext,
        status: ApplicationStatus,
    ) -> (Animal, AdoptionApplication) {
        let applicant = h.person(Role::User).await;
        let animal = h.animal(AnimalListingStatus::Published).await;
        let application = h
            .services
            .applications
            .submit(Some(&applicant), application_form(animal.id))
            .await
            .unwrap();
        let application = h
            .services
            .applications
            .update_status(
                Some(staff),
                application.id,
                UpdateStatusForm {
                    status,
                    internal_notes: None,
                    status_change_reason: Some("Reviewed".into()),
                },
            )
            .await
            .unwrap();
        (animal, application)
    }

    #[tokio::test]
    async fn test_adoption_adopts_application_and_archives_animal() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let (animal, application) = application_in(&h, &staff, ApplicationStatus::Approved).await;
        h.revalidator.take();

        let outcome = assert_ok!(
            h.services.outcomes.create_outcome(Some(&staff), animal.id, adoption(application.id)).await
        );
        assert_eq!(outcome.application_id, Some(application.id));
        assert_eq!(outcome.recorded_by, staff.person_id);

        let application = h.store.find_application(application.id).await.unwrap().unwrap();
        assert_eq!(application.status, ApplicationStatus::Adopted);
        let animal = h.store.find_animal(animal.id).await.unwrap().unwrap();
        assert_eq!(animal.listing_status, AnimalListingStatus::Archived);

        let tags = h.revalidator.take();
        assert!(tags.contains(&ViewTag::PublicPets));
        assert!(tags.contains(&ViewTag::Application(application.id)));
    }

    #[tokio::test]
    async fn test_unapproved_application_writes_nothing() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let (animal, application) = application_in(&h, &staff, ApplicationStatus::Reviewing).await;

        let err = h
            .services
            .outcomes
            .create_outcome(Some(&staff), animal.id, adoption(application.id))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("application_id"));

        assert!(h.store.find_outcome_for_animal(animal.id).await.unwrap().is_none());
        let application = h.store.find_application(application.id).await.unwrap().unwrap();
        assert_eq!(application.status, ApplicationStatus::Reviewing);
        let animal = h.store.find_animal(animal.id).await.unwrap().unwrap();
        assert_eq!(animal.listing_status, AnimalListingStatus::PendingAdoption);
    }

    #[tokio::test]
    async fn test_application_of_another_animal_is_rejected() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let (_, application) = application_in(&h, &staff, ApplicationStatus::Approved).await;
        let other = h.animal(AnimalListingStatus::Published).await;

        let err = h
            .services
            .outcomes
            .create_outcome(Some(&staff), other.id, adoption(application.id))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("application_id"));
    }

    #[tokio::test]
    async fn test_second_outcome_conflicts() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let animal = h.animal(AnimalListingStatus::Published).await;
        let transfer = || OutcomeForm {
            outcome_type: OutcomeType::Transfer,
            outcome_date: None,
            application_id: None,
            destination: Some("County rescue".into()),
            notes: None,
        };

        let outcome = assert_ok!(h.services.outcomes.create_outcome(Some(&staff), animal.id, transfer()).await);
        assert_eq!(outcome.application_id, None);

        let err = h
            .services
            .outcomes
            .create_outcome(Some(&staff), animal.id, transfer())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let fetched = h.services.outcomes.get_outcome(Some(&staff), animal.id).await.unwrap();
        assert_eq!(fetched.id, outcome.id);
    }

    #[tokio::test]
    async fn test_outcomes_are_staff_only() {
        let h = Harness::new();
        let user = h.person(Role::User).await;
        let animal = h.animal(AnimalListingStatus::Published).await;
        let form = OutcomeForm {
            outcome_type: OutcomeType::Died,
            outcome_date: None,
            application_id: None,
            destination: None,
            notes: None,
        };

        let err = h.services.outcomes.create_outcome(Some(&user), animal.id, form).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
        assert!(h.store.find_outcome_for_animal(animal.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guard_failure_in_store_rolls_back() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let (animal, application) = application_in(&h, &staff, ApplicationStatus::Approved).await;

        // Application moves after the service check but before the write
        let mut raced = h.store.find_application(application.id).await.unwrap().unwrap();
        raced.status = ApplicationStatus::Withdrawn;
        h.store.update_application(raced).await.unwrap();

        let ts = now();
        let err = h
            .store
            .record_outcome(Outcome {
                id: Uuid::new_v4(),
                animal_id: animal.id,
                outcome_type: OutcomeType::Adoption,
                outcome_date: ts.date_naive(),
                application_id: Some(application.id),
                destination: None,
                notes: None,
                recorded_by: staff.person_id,
                created_at: ts,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        assert!(h.store.find_outcome_for_animal(animal.id).await.unwrap().is_none());
        let animal = h.store.find_animal(animal.id).await.unwrap().unwrap();
        assert_ne!(animal.listing_status, AnimalListingStatus::Archived);
    }
}
