//! Assessment template and assessment forms

use super::{de, not_in_future, schema_error};
use crate::db::models::{AssessmentRating, FieldType, TemplateField};
use crate::errors::FieldErrors;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "unique_labels", skip_on_field_errors = false))]
pub struct TemplateForm {
    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "Add at least one field"), nested)]
    pub fields: Vec<TemplateFieldInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "select_needs_options", skip_on_field_errors = false))]
pub struct TemplateFieldInput {
    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 100, message = "Label is required"))]
    pub label: String,

    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Allowed values, SELECT only
    #[serde(default)]
    pub options: Vec<String>,
}

fn unique_labels(form: &TemplateForm) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for field in &form.fields {
        if !seen.insert(field.label.trim().to_lowercase()) {
            return Err(schema_error("fields", "duplicate_label", "Field labels must be unique"));
        }
    }
    Ok(())
}

fn select_needs_options(field: &TemplateFieldInput) -> Result<(), ValidationError> {
    let has_options = field.options.iter().any(|o| !o.trim().is_empty());
    match field.field_type {
        FieldType::Select if !has_options => Err(schema_error(
            "options",
            "required",
            "Select fields need at least one option",
        )),
        FieldType::Select => Ok(()),
        _ if has_options => Err(schema_error(
            "options",
            "not_allowed",
            "Only select fields take options",
        )),
        _ => Ok(()),
    }
}

/// Completed assessment for one animal
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AssessmentForm {
    pub template_id: Uuid,

    /// Defaults to today
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(custom(function = "not_in_future"))]
    pub assessed_on: Option<NaiveDate>,

    pub rating: AssessmentRating,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 2000))]
    pub summary: Option<String>,

    /// Answers keyed by template field id
    #[serde(default)]
    pub answers: Map<String, Value>,
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_answer(field: &TemplateField, value: &Value) -> Option<String> {
    match (field.field_type, value) {
        (FieldType::Text, Value::String(_)) => None,
        (FieldType::Text, _) => Some("Must be text".to_string()),
        (FieldType::Number, Value::Number(_)) => None,
        (FieldType::Number, Value::String(s)) if s.trim().parse::<f64>().is_ok() => None,
        (FieldType::Number, _) => Some("Must be a number".to_string()),
        (FieldType::Boolean, Value::Bool(_)) => None,
        (FieldType::Boolean, _) => Some("Must be true or false".to_string()),
        (FieldType::Date, Value::String(s)) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => None,
        (FieldType::Date, _) => Some("Must be a date (YYYY-MM-DD)".to_string()),
        (FieldType::Select, Value::String(s)) if field.option_values().iter().any(|o| o == s) => None,
        (FieldType::Select, _) => Some(format!("Must be one of: {}", field.option_values().join(", "))),
    }
}

/// Check answers against a template's fields.
///
/// Errors are keyed `answers.<field id>`.
pub fn validate_answers(fields: &[TemplateField], answers: &Map<String, Value>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let known: HashSet<String> = fields.iter().map(|f| f.id.to_string()).collect();

    for key in answers.keys().filter(|k| !known.contains(*k)) {
        errors
            .entry(format!("answers.{}", key))
            .or_default()
            .push("Unknown field".to_string());
    }

    for field in fields {
        let key = field.id.to_string();
        let message = match answers.get(&key) {
            None => field.required.then(|| "This field is required".to_string()),
            Some(value) if is_blank(value) => field.required.then(|| "This field is required".to_string()),
            Some(value) => check_answer(field, value),
        };
        if let Some(message) = message {
            errors.entry(format!("answers.{}", key)).or_default().push(message);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::collect_field_errors;
    use serde_json::json;

    fn field(label: &str, field_type: FieldType, required: bool, options: &[&str]) -> TemplateField {
        TemplateField {
            id: Uuid::new_v4(),
            template_id: Uuid::nil(),
            position: 0,
            label: label.into(),
            field_type,
            required,
            options: json!(options),
        }
    }

    fn input(label: &str, field_type: FieldType, options: &[&str]) -> TemplateFieldInput {
        TemplateFieldInput {
            label: label.into(),
            field_type,
            required: true,
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_template_needs_fields() {
        let form = TemplateForm { name: "Intake".into(), description: None, fields: vec![] };
        assert!(collect_field_errors(&form.validate().unwrap_err()).contains_key("fields"));
    }

    #[test]
    fn test_select_field_without_options() {
        let form = TemplateForm {
            name: "Behavior".into(),
            description: None,
            fields: vec![input("Temperament", FieldType::Select, &[])],
        };
        let errors = collect_field_errors(&form.validate().unwrap_err());
        assert!(errors.contains_key("fields[0].options"), "{errors:?}");
    }

    #[test]
    fn test_duplicate_labels() {
        let form = TemplateForm {
            name: "Behavior".into(),
            description: None,
            fields: vec![input("Energy", FieldType::Text, &[]), input("energy ", FieldType::Number, &[])],
        };
        let errors = collect_field_errors(&form.validate().unwrap_err());
        assert_eq!(errors["fields"], vec!["Field labels must be unique".to_string()]);
    }

    #[test]
    fn test_answers_match_field_types() {
        let energy = field("Energy", FieldType::Select, true, &["LOW", "HIGH"]);
        let weight = field("Weight", FieldType::Number, false, &[]);
        let kids = field("Good with kids", FieldType::Boolean, true, &[]);
        let fields = vec![energy.clone(), weight.clone(), kids.clone()];

        let mut answers = Map::new();
        answers.insert(energy.id.to_string(), json!("HIGH"));
        answers.insert(weight.id.to_string(), json!("12.5"));
        answers.insert(kids.id.to_string(), json!(true));
        assert!(validate_answers(&fields, &answers).is_ok());

        answers.insert(energy.id.to_string(), json!("MEDIUM"));
        answers.insert(kids.id.to_string(), json!("sometimes"));
        let errors = validate_answers(&fields, &answers).unwrap_err();
        assert!(errors.contains_key(&format!("answers.{}", energy.id)));
        assert!(errors.contains_key(&format!("answers.{}", kids.id)));
        assert!(!errors.contains_key(&format!("answers.{}", weight.id)));
    }

    #[test]
    fn test_required_missing_and_unknown_answers() {
        let notes = field("Notes", FieldType::Text, true, &[]);
        let seen = field("Seen on", FieldType::Date, false, &[]);
        let fields = vec![notes.clone(), seen.clone()];

        let mut answers = Map::new();
        answers.insert(notes.id.to_string(), json!("  "));
        answers.insert(seen.id.to_string(), json!("2024-13-01"));
        answers.insert("bogus".to_string(), json!(1));

        let errors = validate_answers(&fields, &answers).unwrap_err();
        assert_eq!(errors[&format!("answers.{}", notes.id)], vec!["This field is required".to_string()]);
        assert!(errors.contains_key(&format!("answers.{}", seen.id)));
        assert_eq!(errors["answers.bogus"], vec!["Unknown field".to_string()]);
    }
}
