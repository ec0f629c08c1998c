//! Animal task forms

use super::{de, schema_error};
use crate::db::models::{TaskCategory, TaskPriority, TaskStatus};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "initial_status_rule", skip_on_field_errors = false))]
pub struct CreateTaskForm {
    #[serde(deserialize_with = "de::trimmed")]
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[validate(length(max = 2000))]
    pub details: Option<String>,

    pub category: TaskCategory,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    pub assignee_id: Option<Uuid>,
}

fn initial_status_rule(form: &CreateTaskForm) -> Result<(), ValidationError> {
    if form.status == TaskStatus::Deleted {
        return Err(schema_error("status", "deleted", "A new task cannot start deleted"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskStatusForm {
    pub status: TaskStatus,
}

/// `None` unassigns
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskAssigneeForm {
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    pub assignee_id: Option<Uuid>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn task_form(title: &str) -> CreateTaskForm {
        CreateTaskForm {
            title: title.into(),
            details: None,
            category: TaskCategory::Medical,
            priority: TaskPriority::High,
            status: TaskStatus::Todo,
            due_date: None,
            assignee_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::task_form;
    use super::*;
    use crate::forms::collect_field_errors;

    #[test]
    fn test_deleted_is_not_an_initial_status() {
        let mut form = task_form("Vaccinate");
        form.status = TaskStatus::Deleted;
        let errors = collect_field_errors(&form.validate().unwrap_err());
        assert!(errors.contains_key("status"));
    }

    #[test]
    fn test_title_bounds() {
        assert!(task_form("").validate().is_err());
        assert!(task_form(&"x".repeat(201)).validate().is_err());
        assert!(task_form("Trim nails").validate().is_ok());
    }

    #[test]
    fn test_whitespace_title_is_required() {
        let form: CreateTaskForm =
            serde_json::from_value(serde_json::json!({ "title": "   ", "category": "MEDICAL" })).unwrap();
        let errors = collect_field_errors(&form.validate().unwrap_err());
        assert_eq!(errors["title"], vec!["Title is required".to_string()]);

        let form: CreateTaskForm =
            serde_json::from_value(serde_json::json!({ "title": "  Walk  ", "category": "MEDICAL" })).unwrap();
        assert_eq!(form.title, "Walk");
    }

    #[test]
    fn test_defaults_from_json() {
        let form: CreateTaskForm =
            serde_json::from_value(serde_json::json!({ "title": "Walk", "category": "FEEDING", "assignee_id": "" }))
                .unwrap();
        assert_eq!(form.status, TaskStatus::Todo);
        assert_eq!(form.priority, TaskPriority::Medium);
        assert_eq!(form.assignee_id, None);
    }
}
