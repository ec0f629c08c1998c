//! Animal record, note and characteristic forms

use super::{de, not_in_future};
use crate::db::models::{AnimalListingStatus, HealthStatus, LegalStatus, NoteCategory, Sex};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Intake and edit form for an animal. Edits resubmit the whole record.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AnimalForm {
    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 50, message = "Species is required"))]
    pub species: String,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 100))]
    pub breed: Option<String>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 50))]
    pub color: Option<String>,

    #[serde(default)]
    pub sex: Sex,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(custom(function = "not_in_future"))]
    pub birth_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(range(exclusive_min = 0.0, max = 500.0, message = "Weight must be between 0 and 500 kg"))]
    pub weight_kg: Option<f64>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(range(exclusive_min = 0.0, max = 300.0, message = "Height must be between 0 and 300 cm"))]
    pub height_cm: Option<f64>,

    #[serde(default)]
    pub health_status: HealthStatus,

    #[serde(default)]
    pub legal_status: LegalStatus,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 5000))]
    pub description: Option<String>,

    /// Defaults to today
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(custom(function = "not_in_future"))]
    pub intake_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ListingStatusForm {
    pub listing_status: AnimalListingStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NoteForm {
    #[serde(default)]
    pub category: NoteCategory,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 5000, message = "Note cannot be empty"))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CharacteristicForm {
    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 50, message = "Name is required"))]
    pub name: String,

    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,
}

/// Complete desired characteristic set for one animal
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReplaceCharacteristicsForm {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub characteristic_ids: Vec<Uuid>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn animal_form(name: &str, species: &str) -> AnimalForm {
        AnimalForm {
            name: name.into(),
            species: species.into(),
            breed: None,
            color: Some("Brindle".into()),
            sex: Sex::Female,
            birth_date: NaiveDate::from_ymd_opt(2021, 4, 2),
            weight_kg: Some(18.5),
            height_cm: None,
            health_status: HealthStatus::Healthy,
            legal_status: LegalStatus::ShelterOwned,
            location: Some("Kennel 4".into()),
            description: None,
            intake_date: None,
        }
    }
}
