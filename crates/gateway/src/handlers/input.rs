//! Form body extractor accepting JSON or urlencoded posts
//!
//! A body that decodes but does not fit the form is answered the same way a
//! failed action is: `422` with messages keyed by field path. Bodies that are
//! not a form at all (bad syntax, unknown fields, other content types) are `400`.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shelter_common::{
    actions::settle,
    errors::{AppError, FieldErrors, Result},
};

const REQUIRED: &str = "This field is required";

/// Request body decoded from `application/json` or
/// `application/x-www-form-urlencoded`.
#[derive(Debug, Clone)]
pub struct ActionInput<T>(pub T);

impl<S, T> FromRequest<S> for ActionInput<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        // Body limit rejections keep their own status
        let body = Bytes::from_request(req, state).await.map_err(IntoResponse::into_response)?;

        decode(&content_type, &body).map(Self).map_err(reject)
    }
}

fn reject(err: AppError) -> Response {
    match settle::<()>(Err(err), StatusCode::OK, "") {
        Ok(action) => action.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Decode a form body. Field-level problems become validation errors.
pub(crate) fn decode<T: DeserializeOwned>(content_type: &str, body: &[u8]) -> Result<T> {
    let value = if content_type.starts_with("application/json") {
        serde_json::from_slice::<Value>(body).map_err(|e| AppError::InvalidFormat {
            message: format!("Malformed JSON body: {}", e),
        })?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        urlencoded_to_value(body)?
    } else {
        return Err(AppError::InvalidFormat {
            message: "Send the form as JSON or application/x-www-form-urlencoded".to_string(),
        });
    };

    serde_path_to_error::deserialize(value).map_err(field_error)
}

/// Every urlencoded value arrives as text. Repeated keys and `key[]` become lists.
fn urlencoded_to_value(body: &[u8]) -> Result<Value> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|e| AppError::InvalidFormat {
            message: format!("Malformed form body: {}", e),
        })?;

    let mut map = Map::new();
    for (key, value) in pairs {
        let (key, is_list) = match key.strip_suffix("[]") {
            Some(name) => (name.to_string(), true),
            None => (key, false),
        };
        let value = Value::String(value);
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None if is_list => {
                map.insert(key, Value::Array(vec![value]));
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Ok(Value::Object(map))
}

fn field_error(err: serde_path_to_error::Error<serde_json::Error>) -> AppError {
    let path = err.path().to_string();
    let inner = err.inner().to_string();

    if inner.starts_with("unknown field") {
        return AppError::InvalidFormat { message: inner };
    }

    let (field, message) = if let Some(name) = backticked(&inner, "missing field `") {
        let field = if path == "." { name.to_string() } else { format!("{}.{}", path, name) };
        (field, REQUIRED.to_string())
    } else if inner.starts_with("unknown variant") {
        (path, "Select a valid option".to_string())
    } else if inner.contains("untagged")
        || inner.starts_with("invalid type")
        || inner.starts_with("invalid value")
    {
        (path, "Invalid value".to_string())
    } else {
        (path, inner)
    };

    let mut errors = FieldErrors::new();
    errors.insert(field, vec![message]);
    AppError::fields(errors)
}

fn backticked<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        title: String,
        #[serde(deserialize_with = "shelter_common::forms::de::number")]
        size: i32,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[allow(dead_code)]
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    enum Kind {
        Medical,
    }

    #[allow(dead_code)]
    #[derive(Debug, Deserialize)]
    struct Line {
        label: String,
    }

    #[allow(dead_code)]
    #[derive(Debug, Deserialize)]
    struct Nested {
        kind: Kind,
        lines: Vec<Line>,
    }

    const FORM: &str = "application/x-www-form-urlencoded";
    const JSON: &str = "application/json";

    fn request(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    fn errors_of(err: AppError) -> FieldErrors {
        err.field_errors().expect("validation error")
    }

    #[tokio::test]
    async fn test_json_and_form_bodies() {
        let ActionInput(json) = ActionInput::<Sample>::from_request(
            request(JSON, r#"{"title":"Walk","size":2,"tags":["a","b"]}"#),
            &(),
        )
        .await
        .unwrap();
        let ActionInput(form) = ActionInput::<Sample>::from_request(
            request(FORM, "title=Walk&size=2&tags=a&tags=b"),
            &(),
        )
        .await
        .unwrap();

        assert_eq!(json, form);
    }

    #[test]
    fn test_bracketed_keys_make_lists() {
        let sample: Sample = decode(FORM, b"title=Walk&size=1&tags%5B%5D=only").unwrap();
        assert_eq!(sample.tags, vec!["only".to_string()]);
    }

    #[test]
    fn test_missing_field_is_a_field_error() {
        let err = decode::<Sample>(JSON, br#"{"size":2}"#).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(errors_of(err)["title"], vec![REQUIRED.to_string()]);

        let err = decode::<Nested>(JSON, br#"{"kind":"MEDICAL","lines":[{}]}"#).unwrap_err();
        assert!(errors_of(err).contains_key("lines[0].label"));
    }

    #[test]
    fn test_bad_values_name_their_field() {
        let err = decode::<Nested>(JSON, br#"{"kind":"BOGUS","lines":[]}"#).unwrap_err();
        assert_eq!(errors_of(err)["kind"], vec!["Select a valid option".to_string()]);

        let err = decode::<Sample>(FORM, b"title=Walk&size=").unwrap_err();
        assert_eq!(errors_of(err)["size"], vec![REQUIRED.to_string()]);

        let err = decode::<Sample>(FORM, b"title=Walk&size=lots").unwrap_err();
        assert_eq!(errors_of(err)["size"], vec!["Must be a number".to_string()]);
    }

    #[test]
    fn test_unknown_fields_and_types_are_rejected() {
        let extra = decode::<Sample>(JSON, br#"{"title":"Walk","size":2,"admin":true}"#);
        assert!(matches!(extra, Err(AppError::InvalidFormat { .. })));

        let text = decode::<Sample>("text/plain", b"title=Walk");
        assert!(matches!(text, Err(AppError::InvalidFormat { .. })));

        let broken = decode::<Sample>(JSON, b"{\"title\":");
        assert!(matches!(broken, Err(AppError::InvalidFormat { .. })));
    }

    #[tokio::test]
    async fn test_rejection_renders_action_state() {
        let response = ActionInput::<Sample>::from_request(request(JSON, r#"{"size":2}"#), &())
            .await
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let state: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(state["success"], false);
        assert_eq!(state["errors"]["title"][0], REQUIRED);
    }
}
