//! Typed request forms and their validation rules
//!
//! Each mutating operation takes one of these DTOs. Forms are deserialized
//! from JSON or urlencoded bodies, then checked with `validator` before any
//! store access. Failures come back as a field-name to messages map.

pub mod de;
mod animal;
mod application;
mod assessment;
mod outcome;
mod task;

pub use animal::{AnimalForm, CharacteristicForm, ListingStatusForm, NoteForm, ReplaceCharacteristicsForm};
pub use application::{SubmitApplicationForm, UpdateStatusForm};
pub use assessment::{validate_answers, AssessmentForm, TemplateFieldInput, TemplateForm};
pub use outcome::OutcomeForm;
pub use task::{CreateTaskForm, TaskAssigneeForm, TaskStatusForm};

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) use super::animal::fixtures::*;
    pub(crate) use super::application::fixtures::*;
    pub(crate) use super::task::fixtures::*;
}

use crate::errors::{AppError, FieldErrors, Result};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Key validator uses for struct-level (schema) errors
const SCHEMA_KEY: &str = "__all__";

/// Param a schema error uses to name the field it belongs to
const FIELD_PARAM: &str = "field";

/// Run the derived rules and convert failures into an `AppError::Validation`
pub fn validate_form<T: Validate>(form: &T) -> Result<()> {
    form.validate().map_err(AppError::from)
}

/// Flatten validator output into `field -> [message]`.
///
/// Nested structs become `parent.child`, list items `parent[i].child`.
/// Schema errors land on the field named by their `field` param.
pub fn collect_field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    collect_into(&mut out, None, errors);
    out
}

fn collect_into(out: &mut FieldErrors, prefix: Option<&str>, errors: &ValidationErrors) {
    for (name, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let field = if AsRef::<str>::as_ref(name) == SCHEMA_KEY {
                        err.params
                            .get(FIELD_PARAM)
                            .and_then(|v| v.as_str())
                            .unwrap_or("form")
                            .to_string()
                    } else {
                        name.to_string()
                    };
                    out.entry(join(prefix, &field)).or_default().push(describe(err));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_into(out, Some(&join(prefix, name)), inner);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let key = format!("{}[{}]", join(prefix, name), index);
                    collect_into(out, Some(&key), inner);
                }
            }
        }
    }
}

fn join(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{}.{}", p, name),
        None => name.to_string(),
    }
}

/// Human-readable message for a validator error
fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }

    let param = |key: &str| err.params.get(key).map(|v| v.to_string());

    match err.code.as_ref() {
        "email" => "Enter a valid email address".to_string(),
        "required" => "This field is required".to_string(),
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("Must be between {} and {} characters", min, max),
            (Some(min), None) => format!("Must be at least {} characters", min),
            (None, Some(max)) => format!("Must be at most {} characters", max),
            _ => "Invalid length".to_string(),
        },
        "range" => match (param("min").or(param("exclusive_min")), param("max")) {
            (Some(min), Some(max)) => format!("Must be between {} and {}", min, max),
            (Some(min), None) => format!("Must be at least {}", min),
            (None, Some(max)) => format!("Must be at most {}", max),
            _ => "Out of range".to_string(),
        },
        _ => "Invalid value".to_string(),
    }
}

/// Struct-level rule failure attached to `field`
pub(crate) fn schema_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code).with_message(Cow::Borrowed(message));
    err.add_param(Cow::Borrowed(FIELD_PARAM), &field);
    err
}

/// Reject dates after today
pub(crate) fn not_in_future(date: &chrono::NaiveDate) -> std::result::Result<(), ValidationError> {
    if *date > chrono::Utc::now().date_naive() {
        return Err(ValidationError::new("future_date").with_message(Cow::Borrowed("Date cannot be in the future")));
    }
    Ok(())
}
