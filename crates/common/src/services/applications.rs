//! Adoption application lifecycle

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, ANY_ROLE, STAFF_ROLES};
use crate::cache::{Revalidate, ViewTag};
use crate::db::models::{AdoptionApplication, AnimalListingStatus, ApplicationStatus};
use crate::db::{ApplicationFilter, ShelterStore};
use crate::errors::{AppError, Result};
use crate::forms::{validate_form, SubmitApplicationForm, UpdateStatusForm};
use crate::metrics::record_application_transition;
use crate::workflow::{ensure_staff_transition, is_closed};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>) -> Self {
        Self { store, revalidator }
    }

    async fn load(&self, id: Uuid) -> Result<AdoptionApplication> {
        self.store
            .find_application(id)
            .await?
            .ok_or_else(|| AppError::not_found("application", id))
    }

    /// Load an application the caller owns
    async fn load_own(&self, session: &SessionContext, id: Uuid) -> Result<AdoptionApplication> {
        let application = self.load(id).await?;
        if application.applicant_id != session.person_id {
            return Err(AppError::access_denied());
        }
        Ok(application)
    }

    /// One open application per applicant and animal. `reopening` is skipped.
    async fn ensure_single_open(&self, animal_id: Uuid, applicant_id: Uuid, reopening: Option<Uuid>) -> Result<()> {
        let existing = self
            .store
            .list_applications(&ApplicationFilter {
                animal_id: Some(animal_id),
                applicant_id: Some(applicant_id),
                ..Default::default()
            })
            .await?;
        if existing.iter().any(|a| Some(a.id) != reopening && !is_closed(a.status)) {
            return Err(AppError::Conflict {
                message: "You already have an open application for this animal".to_string(),
            });
        }
        Ok(())
    }

    async fn changed(&self, application: &AdoptionApplication) {
        self.revalidator
            .revalidate(&[
                ViewTag::Applications,
                ViewTag::Application(application.id),
                ViewTag::Dashboard,
            ])
            .await;
    }

    /// Apply for an adoptable animal. Starts in PENDING.
    #[instrument(skip(self, session, form), fields(animal_id = %form.animal_id))]
    pub async fn submit(
        &self,
        session: Option<&SessionContext>,
        form: SubmitApplicationForm,
    ) -> Result<AdoptionApplication> {
        let session = require_roles(session, ANY_ROLE)?;
        validate_form(&form)?;

        let mut animal = require_animal(self.store.as_ref(), form.animal_id).await?;
        if !animal.listing_status.is_public() {
            return Err(AppError::not_found("animal", animal.id));
        }

        self.ensure_single_open(animal.id, session.person_id, None).await?;

        let ts = now();
        let application = self
            .store
            .insert_application(AdoptionApplication {
                id: Uuid::new_v4(),
                animal_id: animal.id,
                applicant_id: session.person_id,
                status: ApplicationStatus::Pending,
                full_name: form.full_name.trim().to_string(),
                email: form.email.trim().to_lowercase(),
                phone: form.phone.trim().to_string(),
                address: form.address.trim().to_string(),
                city: form.city.trim().to_string(),
                postal_code: form.postal_code.trim().to_string(),
                housing_type: form.housing_type,
                owns_home: form.owns_home,
                landlord_permission: if form.owns_home { None } else { form.landlord_permission },
                household_size: form.household_size,
                has_children: form.has_children,
                other_pets: form.other_pets,
                experience: form.experience,
                reason: form.reason,
                internal_notes: None,
                status_change_reason: None,
                status_changed_at: None,
                status_changed_by: None,
                created_at: ts,
                updated_at: ts,
            })
            .await?;

        if animal.listing_status == AnimalListingStatus::Published {
            animal.listing_status = AnimalListingStatus::PendingAdoption;
            animal.updated_at = ts;
            self.store.update_animal(animal).await?;
            self.revalidator
                .revalidate(&[ViewTag::PublicPets, ViewTag::Animal(application.animal_id)])
                .await;
        }

        info!(application_id = %application.id, "Adoption application submitted");
        self.changed(&application).await;

        Ok(application)
    }

    /// Staff see any application, applicants only their own (without staff notes)
    pub async fn get(&self, session: Option<&SessionContext>, id: Uuid) -> Result<AdoptionApplication> {
        let session = require_roles(session, ANY_ROLE)?;
        if session.is_staff() {
            return self.load(id).await;
        }
        self.load_own(session, id).await.map(AdoptionApplication::redacted)
    }

    pub async fn list(
        &self,
        session: Option<&SessionContext>,
        mut filter: ApplicationFilter,
    ) -> Result<Vec<AdoptionApplication>> {
        let session = require_roles(session, ANY_ROLE)?;
        if session.is_staff() {
            return self.store.list_applications(&filter).await;
        }

        filter.applicant_id = Some(session.person_id);
        let applications = self.store.list_applications(&filter).await?;
        Ok(applications.into_iter().map(AdoptionApplication::redacted).collect())
    }

    /// Staff review: move the application through the transition table
    #[instrument(skip(self, session, form), fields(application_id = %id, to = %form.status))]
    pub async fn update_status(
        &self,
        session: Option<&SessionContext>,
        id: Uuid,
        form: UpdateStatusForm,
    ) -> Result<AdoptionApplication> {
        let session = require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;

        let mut application = self.load(id).await?;
        let from = application.status;
        ensure_staff_transition(from, form.status)?;

        let moved = from != form.status;
        if moved && form.status_change_reason.is_none() {
            return Err(AppError::field(
                "status_change_reason",
                "Give a reason for the status change",
            ));
        }
        if is_closed(from) && !is_closed(form.status) {
            self.ensure_single_open(application.animal_id, application.applicant_id, Some(application.id))
                .await?;
        }

        let ts = now();
        if form.internal_notes.is_some() {
            application.internal_notes = form.internal_notes;
        }
        if moved {
            application.status = form.status;
            application.status_change_reason = form.status_change_reason;
            application.status_changed_at = Some(ts);
            application.status_changed_by = Some(session.person_id);
        }
        application.updated_at = ts;

        let application = self.store.update_application(application).await?;

        if moved {
            record_application_transition(&from.to_string(), &application.status.to_string());
            info!(from = %from, "Application status changed");
        }
        self.changed(&application).await;

        Ok(application)
    }

    /// Applicant pulls out of an open application
    pub async fn withdraw(&self, session: Option<&SessionContext>, id: Uuid) -> Result<AdoptionApplication> {
        let session = require_roles(session, ANY_ROLE)?;
        let application = self.load_own(session, id).await?;

        if is_closed(application.status) {
            return Err(AppError::InvalidTransition {
                entity: "application",
                from: application.status.to_string(),
                to: ApplicationStatus::Withdrawn.to_string(),
            });
        }

        self.applicant_move(session, application, ApplicationStatus::Withdrawn).await
    }

    /// Applicant reopens a withdrawn application
    pub async fn reactivate(&self, session: Option<&SessionContext>, id: Uuid) -> Result<AdoptionApplication> {
        let session = require_roles(session, ANY_ROLE)?;
        let application = self.load_own(session, id).await?;

        if application.status != ApplicationStatus::Withdrawn {
            return Err(AppError::InvalidTransition {
                entity: "application",
                from: application.status.to_string(),
                to: ApplicationStatus::Pending.to_string(),
            });
        }

        let animal = require_animal(self.store.as_ref(), application.animal_id).await?;
        if !animal.listing_status.is_public() {
            return Err(AppError::Conflict {
                message: "This animal is no longer available for adoption".to_string(),
            });
        }
        self.ensure_single_open(application.animal_id, application.applicant_id, Some(application.id))
            .await?;

        self.applicant_move(session, application, ApplicationStatus::Pending).await
    }

    async fn applicant_move(
        &self,
        session: &SessionContext,
        mut application: AdoptionApplication,
        to: ApplicationStatus,
    ) -> Result<AdoptionApplication> {
        let from = application.status;
        let ts = now();
        application.status = to;
        application.status_change_reason = None;
        application.status_changed_at = Some(ts);
        application.status_changed_by = Some(session.person_id);
        application.updated_at = ts;

        let application = self.store.update_application(application).await?;

        record_application_transition(&from.to_string(), &to.to_string());
        info!(application_id = %application.id, from = %from, to = %to, "Applicant moved application");
        self.changed(&application).await;

        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::forms::fixtures::application_form;
    use crate::services::testing::Harness;
    use sea_orm::Iterable;
    use tokio_test::{assert_err, assert_ok};

    fn review(status: ApplicationStatus, reason: Option<&str>) -> UpdateStatusForm {
        UpdateStatusForm {
            status,
            internal_notes: None,
            status_change_reason: reason.map(String::from),
        }
    }

    async fn submitted(h: &Harness, applicant: &SessionContext) -> AdoptionApplication {
        let animal = h.animal(AnimalListingStatus::Published).await;
        h.services
            .applications
            .submit(Some(applicant), application_form(animal.id))
            .await
            .unwrap()
    }

    async fn force_status(h: &Harness, id: Uuid, status: ApplicationStatus) {
        let mut application = h.store.find_application(id).await.unwrap().unwrap();
        application.status = status;
        h.store.update_application(application).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_starts_pending_and_holds_the_animal() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;

        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.applicant_id, applicant.person_id);
        let animal = h.store.find_animal(application.animal_id).await.unwrap().unwrap();
        assert_eq!(animal.listing_status, AnimalListingStatus::PendingAdoption);

        let tags = h.revalidator.take();
        assert!(tags.contains(&ViewTag::PublicPets));
        assert!(tags.contains(&ViewTag::Application(application.id)));
    }

    #[tokio::test]
    async fn test_second_open_application_conflicts() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let first = submitted(&h, &applicant).await;

        let err = h
            .services
            .applications
            .submit(Some(&applicant), application_form(first.animal_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_draft_animals_do_not_take_applications() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;

        let err = h
            .services
            .applications
            .submit(Some(&applicant), application_form(animal.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_zero_household_is_a_field_error_and_writes_nothing() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let animal = h.animal(AnimalListingStatus::Published).await;

        let mut form = application_form(animal.id);
        form.household_size = 0;
        let err = h.services.applications.submit(Some(&applicant), form).await.unwrap_err();

        assert!(err.field_errors().unwrap().contains_key("household_size"));
        assert!(h.store.list_applications(&ApplicationFilter::default()).await.unwrap().is_empty());
        let animal = h.store.find_animal(animal.id).await.unwrap().unwrap();
        assert_eq!(animal.listing_status, AnimalListingStatus::Published);
    }

    #[tokio::test]
    async fn test_adopted_is_never_a_review_target() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;

        for status in ApplicationStatus::iter() {
            force_status(&h, application.id, status).await;
            let result = h
                .services
                .applications
                .update_status(Some(&staff), application.id, review(ApplicationStatus::Adopted, Some("done")))
                .await;
            assert_err!(result);
        }
    }

    #[tokio::test]
    async fn test_adopted_application_is_frozen_for_every_role() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;
        force_status(&h, application.id, ApplicationStatus::Adopted).await;

        for role in Role::iter() {
            let session = h.person(role).await;
            for status in ApplicationStatus::iter() {
                let result = h
                    .services
                    .applications
                    .update_status(Some(&session), application.id, review(status, Some("edit")))
                    .await;
                assert_err!(result);
            }
        }

        let stored = h.store.find_application(application.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Adopted);
    }

    #[tokio::test]
    async fn test_review_records_who_and_why() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;

        let updated = assert_ok!(
            h.services
                .applications
                .update_status(
                    Some(&staff),
                    application.id,
                    review(ApplicationStatus::Approved, Some("Home visit passed")),
                )
                .await
        );
        assert_eq!(updated.status, ApplicationStatus::Approved);
        assert_eq!(updated.status_changed_by, Some(staff.person_id));
        assert_eq!(updated.status_change_reason.as_deref(), Some("Home visit passed"));
        assert!(updated.status_changed_at.is_some());
    }

    #[tokio::test]
    async fn test_status_change_needs_a_reason() {
        let h = Harness::new();
        let staff = h.person(Role::Admin).await;
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;

        let err = h
            .services
            .applications
            .update_status(Some(&staff), application.id, review(ApplicationStatus::Reviewing, None))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("status_change_reason"));

        // Same status only edits notes
        let mut form = review(ApplicationStatus::Pending, None);
        form.internal_notes = Some("Called references".into());
        let updated = assert_ok!(h.services.applications.update_status(Some(&staff), application.id, form).await);
        assert_eq!(updated.status, ApplicationStatus::Pending);
        assert_eq!(updated.internal_notes.as_deref(), Some("Called references"));
        assert!(updated.status_changed_at.is_none());
    }

    #[tokio::test]
    async fn test_review_requires_staff() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;
        let form = || review(ApplicationStatus::Approved, Some("self-approve"));

        let missing = h.services.applications.update_status(None, application.id, form()).await;
        assert!(matches!(missing, Err(AppError::Unauthorized { .. })));

        let user = h.services.applications.update_status(Some(&applicant), application.id, form()).await;
        assert!(matches!(user, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_rejected_cannot_jump_to_approved() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;
        force_status(&h, application.id, ApplicationStatus::Rejected).await;

        let err = h
            .services
            .applications
            .update_status(Some(&staff), application.id, review(ApplicationStatus::Approved, Some("oops")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_withdraw_and_reactivate() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;

        let withdrawn = assert_ok!(h.services.applications.withdraw(Some(&applicant), application.id).await);
        assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
        assert_err!(h.services.applications.withdraw(Some(&applicant), application.id).await);

        let reopened = assert_ok!(h.services.applications.reactivate(Some(&applicant), application.id).await);
        assert_eq!(reopened.status, ApplicationStatus::Pending);
        assert_err!(h.services.applications.reactivate(Some(&applicant), application.id).await);
    }

    #[tokio::test]
    async fn test_reopening_respects_the_single_open_rule() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let applicant = h.person(Role::User).await;
        let first = submitted(&h, &applicant).await;

        h.services.applications.withdraw(Some(&applicant), first.id).await.unwrap();
        let second = assert_ok!(
            h.services
                .applications
                .submit(Some(&applicant), application_form(first.animal_id))
                .await
        );
        assert_eq!(second.status, ApplicationStatus::Pending);

        let err = h.services.applications.reactivate(Some(&applicant), first.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let err = h
            .services
            .applications
            .update_status(Some(&staff), first.id, review(ApplicationStatus::Pending, Some("reopen")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let stored = h.store.find_application(first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Withdrawn);
    }

    #[tokio::test]
    async fn test_only_the_applicant_may_withdraw() {
        let h = Harness::new();
        let applicant = h.person(Role::User).await;
        let stranger = h.person(Role::User).await;
        let application = submitted(&h, &applicant).await;

        let err = h.services.applications.withdraw(Some(&stranger), application.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_applicants_see_only_their_own_without_staff_notes() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let mine = h.person(Role::User).await;
        let other = h.person(Role::User).await;
        let application = submitted(&h, &mine).await;
        submitted(&h, &other).await;

        let mut form = review(ApplicationStatus::Pending, None);
        form.internal_notes = Some("Flag for follow-up".into());
        h.services.applications.update_status(Some(&staff), application.id, form).await.unwrap();

        let listed = h.services.applications.list(Some(&mine), ApplicationFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].internal_notes.is_none());

        let all = h.services.applications.list(Some(&staff), ApplicationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let fetched = h.services.applications.get(Some(&mine), application.id).await.unwrap();
        assert!(fetched.internal_notes.is_none());
        assert_err!(h.services.applications.get(Some(&other), application.id).await);
    }
}
