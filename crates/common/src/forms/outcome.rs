//! Outcome form

use super::{de, not_in_future, schema_error};
use crate::db::models::OutcomeType;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "outcome_rules", skip_on_field_errors = false))]
pub struct OutcomeForm {
    pub outcome_type: OutcomeType,

    /// Defaults to today
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(custom(function = "not_in_future"))]
    pub outcome_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    pub application_id: Option<Uuid>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 200))]
    pub destination: Option<String>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn outcome_rules(form: &OutcomeForm) -> Result<(), ValidationError> {
    match (form.outcome_type, form.application_id, form.destination.as_deref()) {
        (OutcomeType::Adoption, None, _) => Err(schema_error(
            "application_id",
            "required",
            "An adoption must reference an approved application",
        )),
        (OutcomeType::Transfer, _, None) => Err(schema_error(
            "destination",
            "required",
            "A transfer needs a destination",
        )),
        (OutcomeType::Transfer | OutcomeType::ReturnToOwner | OutcomeType::Died, Some(_), _) => {
            Err(schema_error(
                "application_id",
                "not_allowed",
                "Only adoptions reference an application",
            ))
        }
        _ => Ok(()),
    }
}
