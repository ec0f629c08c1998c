//! Deserializer helpers for urlencoded form posts
//!
//! HTML forms send every value as a string and submit empty inputs as `""`.
//! These helpers accept either the native JSON value or its string form.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw<T> {
    Text(String),
    Value(T),
}

/// `""` and missing become `None`; strings are parsed with `FromStr`
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: fmt::Display,
{
    match Option::<Raw<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse::<T>().map(Some).map_err(de::Error::custom)
            }
        }
        Some(Raw::Value(value)) => Ok(Some(value)),
    }
}

fn parse_flag<E: de::Error>(text: &str) -> Result<Option<bool>, E> {
    match text.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "on" | "1" | "yes" => Ok(Some(true)),
        "false" | "off" | "0" | "no" => Ok(Some(false)),
        other => Err(E::custom(format!("invalid boolean: {}", other))),
    }
}

/// Optional boolean that also accepts checkbox values (`on`, `1`, `yes`)
pub fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Raw<bool>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Text(text)) => parse_flag(&text),
        Some(Raw::Value(value)) => Ok(Some(value)),
    }
}

/// Checkbox semantics: absent or empty means `false`
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    optional_flag(deserializer).map(|value| value.unwrap_or(false))
}

/// Required text, surrounding whitespace removed so length rules see the content
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|text| text.trim().to_string())
}

/// Required number that may arrive as text from an urlencoded post
pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: fmt::Display,
{
    match Raw::<T>::deserialize(deserializer)? {
        Raw::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                Err(de::Error::custom("This field is required"))
            } else {
                text.parse::<T>().map_err(|_| de::Error::custom("Must be a number"))
            }
        }
        Raw::Value(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        weight: Option<f64>,
        #[serde(default, deserialize_with = "empty_string_as_none")]
        owner: Option<Uuid>,
        #[serde(default, deserialize_with = "flag")]
        owns_home: bool,
        #[serde(default, deserialize_with = "optional_flag")]
        permission: Option<bool>,
    }

    #[test]
    fn test_json_native_values() {
        let s: Sample =
            serde_json::from_str(r#"{"weight": 4.5, "owns_home": true, "permission": false}"#).unwrap();
        assert_eq!(s.weight, Some(4.5));
        assert!(s.owns_home);
        assert_eq!(s.permission, Some(false));
        assert_eq!(s.owner, None);
    }

    #[test]
    fn test_string_values_are_coerced() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"weight": "12", "owner": "{}", "owns_home": "on", "permission": ""}}"#, id);
        let s: Sample = serde_json::from_str(&body).unwrap();
        assert_eq!(s.weight, Some(12.0));
        assert_eq!(s.owner, Some(id));
        assert!(s.owns_home);
        assert_eq!(s.permission, None);
    }

    #[test]
    fn test_empty_strings_become_none() {
        let s: Sample = serde_json::from_str(r#"{"weight": "", "owner": "  "}"#).unwrap();
        assert_eq!(s.weight, None);
        assert_eq!(s.owner, None);
        assert!(!s.owns_home);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"weight": "heavy"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"owns_home": "maybe"}"#).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Household {
        #[serde(deserialize_with = "trimmed")]
        name: String,
        #[serde(deserialize_with = "number")]
        size: i32,
    }

    #[test]
    fn test_trimmed_strips_whitespace() {
        let h: Household = serde_json::from_str(r#"{"name": "   ", "size": 2}"#).unwrap();
        assert!(h.name.is_empty());
        let h: Household = serde_json::from_str(r#"{"name": "  Ada ", "size": "3"}"#).unwrap();
        assert_eq!(h.name, "Ada");
        assert_eq!(h.size, 3);
    }

    #[test]
    fn test_number_reports_readable_errors() {
        let err = serde_json::from_str::<Household>(r#"{"name": "a", "size": ""}"#).unwrap_err();
        assert!(err.to_string().contains("This field is required"));
        let err = serde_json::from_str::<Household>(r#"{"name": "a", "size": "lots"}"#).unwrap_err();
        assert!(err.to_string().contains("Must be a number"));
    }
}
