//! Form-action results
//!
//! Mutations answer with `{success, message?, errors?, data?}` so a form can
//! be redisplayed with field messages. Authentication and authorization
//! failures are not folded in; they stay errors and use the standard error body.

use crate::errors::{AppError, FieldErrors, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Outcome of a form action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionState<T> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionState<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            errors: None,
            data: Some(data),
        }
    }

    /// Failure state for a non-auth error. Server-side details are logged, not returned.
    pub fn failure(err: &AppError) -> Self {
        if err.is_server_error() {
            tracing::error!(error = %err, code = ?err.code(), "Action failed");
        } else {
            tracing::debug!(error = %err, "Action rejected");
        }

        Self {
            success: false,
            message: Some(err.public_message()),
            errors: err.field_errors(),
            data: None,
        }
    }
}

/// Action state plus the HTTP status it is sent with
#[derive(Debug)]
pub struct Action<T> {
    pub status: StatusCode,
    pub state: ActionState<T>,
}

impl<T: Serialize> IntoResponse for Action<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.state)).into_response()
    }
}

/// Fold a service result into an action.
///
/// `success` is the status for the happy path. Auth errors come back as `Err`.
pub fn settle<T>(result: Result<T>, success: StatusCode, message: &str) -> Result<Action<T>> {
    match result {
        Ok(data) => Ok(Action {
            status: success,
            state: ActionState::ok(message, data),
        }),
        Err(err) if err.is_auth_error() => Err(err),
        Err(err) => Ok(Action {
            status: err.status_code(),
            state: ActionState::failure(&err),
        }),
    }
}
