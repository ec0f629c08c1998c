//! Assessment templates and completed assessments

use super::{now, require_animal};
use crate::auth::{require_roles, SessionContext, ADMIN_ROLES, STAFF_ROLES};
use crate::cache::{Revalidate, ViewTag};
use crate::db::models::{Assessment, AssessmentTemplate, FieldType, TemplateField};
use crate::db::ShelterStore;
use crate::errors::{AppError, Result};
use crate::forms::{validate_answers, validate_form, AssessmentForm, TemplateForm};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Template with its fields in position order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateView {
    #[serde(flatten)]
    pub template: AssessmentTemplate,
    pub fields: Vec<TemplateField>,
}

impl From<(AssessmentTemplate, Vec<TemplateField>)> for TemplateView {
    fn from((template, fields): (AssessmentTemplate, Vec<TemplateField>)) -> Self {
        Self { template, fields }
    }
}

#[derive(Clone)]
pub struct AssessmentService {
    store: Arc<dyn ShelterStore>,
    revalidator: Arc<dyn Revalidate>,
}

impl AssessmentService {
    pub fn new(store: Arc<dyn ShelterStore>, revalidator: Arc<dyn Revalidate>) -> Self {
        Self { store, revalidator }
    }

    pub async fn create_template(&self, session: Option<&SessionContext>, form: TemplateForm) -> Result<TemplateView> {
        require_roles(session, ADMIN_ROLES)?;
        validate_form(&form)?;

        let template = AssessmentTemplate {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            description: form.description,
            created_at: now(),
        };

        let fields = form
            .fields
            .into_iter()
            .enumerate()
            .map(|(position, input)| {
                let options = match input.field_type {
                    FieldType::Select => input
                        .options
                        .into_iter()
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .map(Value::String)
                        .collect(),
                    _ => Vec::new(),
                };
                TemplateField {
                    id: Uuid::new_v4(),
                    template_id: template.id,
                    position: i32::try_from(position).unwrap_or(i32::MAX),
                    label: input.label.trim().to_string(),
                    field_type: input.field_type,
                    required: input.required,
                    options: Value::Array(options),
                }
            })
            .collect();

        let view = TemplateView::from(self.store.insert_template(template, fields).await?);

        info!(template_id = %view.template.id, fields = view.fields.len(), "Assessment template created");
        self.revalidator.revalidate(&[ViewTag::Templates]).await;
        Ok(view)
    }

    pub async fn list_templates(&self, session: Option<&SessionContext>) -> Result<Vec<AssessmentTemplate>> {
        require_roles(session, STAFF_ROLES)?;
        self.store.list_templates().await
    }

    pub async fn get_template(&self, session: Option<&SessionContext>, id: Uuid) -> Result<TemplateView> {
        require_roles(session, STAFF_ROLES)?;
        self.store
            .find_template(id)
            .await?
            .map(TemplateView::from)
            .ok_or_else(|| AppError::not_found("assessment template", id))
    }

    /// Record an assessment; answers are checked against the template fields
    pub async fn create_assessment(
        &self,
        session: Option<&SessionContext>,
        animal_id: Uuid,
        form: AssessmentForm,
    ) -> Result<Assessment> {
        let session = require_roles(session, STAFF_ROLES)?;
        validate_form(&form)?;
        require_animal(self.store.as_ref(), animal_id).await?;

        let (_, fields) = self
            .store
            .find_template(form.template_id)
            .await?
            .ok_or_else(|| AppError::field("template_id", "Unknown assessment template"))?;
        validate_answers(&fields, &form.answers).map_err(AppError::fields)?;

        let ts = now();
        let assessment = self
            .store
            .insert_assessment(Assessment {
                id: Uuid::new_v4(),
                animal_id,
                template_id: form.template_id,
                assessor_id: session.person_id,
                assessed_on: form.assessed_on.unwrap_or_else(|| ts.date_naive()),
                rating: form.rating,
                summary: form.summary,
                answers: Value::Object(form.answers),
                created_at: ts,
            })
            .await?;

        info!(assessment_id = %assessment.id, animal_id = %animal_id, "Assessment recorded");
        self.revalidator.revalidate(&[ViewTag::AnimalAssessments(animal_id)]).await;
        Ok(assessment)
    }

    pub async fn list_assessments(&self, session: Option<&SessionContext>, animal_id: Uuid) -> Result<Vec<Assessment>> {
        require_roles(session, STAFF_ROLES)?;
        self.store.list_assessments(animal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AnimalListingStatus, AssessmentRating, Role};
    use crate::forms::TemplateFieldInput;
    use crate::services::testing::Harness;
    use serde_json::{json, Map};
    use tokio_test::assert_ok;

    fn field(label: &str, field_type: FieldType, required: bool, options: &[&str]) -> TemplateFieldInput {
        TemplateFieldInput {
            label: label.into(),
            field_type,
            required,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn template_form() -> TemplateForm {
        TemplateForm {
            name: "Temperament".into(),
            description: None,
            fields: vec![
                field("Energy", FieldType::Select, true, &["Low", "Medium", "High"]),
                field("Weight check", FieldType::Number, false, &[]),
                field("Crate trained", FieldType::Boolean, true, &[]),
            ],
        }
    }

    fn assessment(template_id: Uuid, answers: Value) -> AssessmentForm {
        let answers: Map<String, Value> = answers.as_object().cloned().unwrap_or_default();
        AssessmentForm {
            template_id,
            assessed_on: None,
            rating: AssessmentRating::Good,
            summary: None,
            answers,
        }
    }

    #[tokio::test]
    async fn test_template_fields_keep_order() {
        let h = Harness::new();
        let admin = h.person(Role::Admin).await;

        let view = assert_ok!(h.services.assessments.create_template(Some(&admin), template_form()).await);
        let labels: Vec<_> = view.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Energy", "Weight check", "Crate trained"]);
        assert_eq!(view.fields[0].option_values(), vec!["Low", "Medium", "High"]);

        let fetched = h.services.assessments.get_template(Some(&admin), view.template.id).await.unwrap();
        assert_eq!(fetched.fields, view.fields);
        assert_eq!(h.services.assessments.list_templates(Some(&admin)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_templates_are_admin_only() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;

        let err = h.services.assessments.create_template(Some(&staff), template_form()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_answers_are_checked_against_fields() {
        let h = Harness::new();
        let admin = h.person(Role::Admin).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;
        let view = h.services.assessments.create_template(Some(&admin), template_form()).await.unwrap();
        let (energy, weight, crate_trained) = (view.fields[0].id, view.fields[1].id, view.fields[2].id);

        let bad = assessment(
            view.template.id,
            json!({ energy.to_string(): "Frantic", weight.to_string(): "heavy" }),
        );
        let err = h.services.assessments.create_assessment(Some(&admin), animal.id, bad).await.unwrap_err();
        let errors = err.field_errors().unwrap();
        assert!(errors.contains_key(&format!("answers.{}", energy)));
        assert!(errors.contains_key(&format!("answers.{}", weight)));
        assert!(errors.contains_key(&format!("answers.{}", crate_trained)));
        assert!(h.store.list_assessments(animal.id).await.unwrap().is_empty());

        let good = assessment(
            view.template.id,
            json!({ energy.to_string(): "High", crate_trained.to_string(): true }),
        );
        let recorded = assert_ok!(h.services.assessments.create_assessment(Some(&admin), animal.id, good).await);
        assert_eq!(recorded.assessor_id, admin.person_id);
        assert_eq!(h.services.assessments.list_assessments(Some(&admin), animal.id).await.unwrap().len(), 1);
        assert_eq!(h.revalidator.take().last(), Some(&ViewTag::AnimalAssessments(animal.id)));
    }

    #[tokio::test]
    async fn test_unknown_template_is_a_field_error() {
        let h = Harness::new();
        let staff = h.person(Role::Staff).await;
        let animal = h.animal(AnimalListingStatus::Draft).await;

        let err = h
            .services
            .assessments
            .create_assessment(Some(&staff), animal.id, assessment(Uuid::new_v4(), json!({})))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("template_id"));
    }
}
