//! Adoption application forms

use super::{de, schema_error};
use crate::db::models::{ApplicationStatus, HousingType};
use regex_lite::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::OnceLock;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[0-9][0-9 ()\-]{5,18}[0-9]$").expect("phone pattern is valid")
    })
}

fn postal_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,8}[A-Za-z0-9]$").expect("postal code pattern is valid"))
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_pattern().is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message(Cow::Borrowed("Enter a valid phone number")))
    }
}

fn validate_postal_code(code: &str) -> Result<(), ValidationError> {
    if postal_code_pattern().is_match(code.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("postal_code").with_message(Cow::Borrowed("Enter a valid postal code")))
    }
}

/// Public adoption application
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "landlord_rule", skip_on_field_errors = false))]
pub struct SubmitApplicationForm {
    pub animal_id: Uuid,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 200, message = "Address is required"))]
    pub address: String,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(custom(function = "validate_postal_code"))]
    pub postal_code: String,

    pub housing_type: HousingType,

    #[serde(default, deserialize_with = "de::flag")]
    pub owns_home: bool,

    /// Required when the applicant rents
    #[serde(default, deserialize_with = "de::optional_flag")]
    pub landlord_permission: Option<bool>,

    #[serde(deserialize_with = "de::number")]
    #[validate(range(min = 1, max = 30, message = "Household size must be at least 1"))]
    pub household_size: i32,

    #[serde(default, deserialize_with = "de::flag")]
    pub has_children: bool,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 500))]
    pub other_pets: Option<String>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 2000))]
    pub experience: Option<String>,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 2000, message = "Tell us why you want to adopt"))]
    pub reason: String,
}

fn landlord_rule(form: &SubmitApplicationForm) -> Result<(), ValidationError> {
    if !form.owns_home && form.landlord_permission.is_none() {
        return Err(schema_error(
            "landlord_permission",
            "required",
            "Landlord permission is required when renting",
        ));
    }
    Ok(())
}

/// Staff review of an application
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusForm {
    pub status: ApplicationStatus,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 5000))]
    pub internal_notes: Option<String>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 1000))]
    pub status_change_reason: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn application_form(animal_id: Uuid) -> SubmitApplicationForm {
        SubmitApplicationForm {
            animal_id,
            full_name: "Robin Alvarez".into(),
            email: "robin@example.org".into(),
            phone: "+1 555-010-2000".into(),
            address: "12 Elm Street".into(),
            city: "Springfield".into(),
            postal_code: "62704".into(),
            housing_type: HousingType::House,
            owns_home: true,
            landlord_permission: None,
            household_size: 2,
            has_children: false,
            other_pets: None,
            experience: Some("Fostered two cats".into()),
            reason: "Quiet home with a garden".into(),
        }
    }
}
