//! Normalize-and-validate combinators for form input.
//!
//! A [`Validator`] takes a raw string and either returns its normalized form
//! or an error message. Validators chain with [`compose_validators`]; each
//! one sees the value produced by the previous one. [`validate_object`]
//! applies a schema of field validators to a JSON object.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub type Validator = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Key under which [`validate_object`] reports a non-object input.
pub const ROOT_ERROR_KEY: &str = "_root";

pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn compose_validators(validators: Vec<Validator>) -> Validator {
    validator(move |raw| {
        validators
            .iter()
            .try_fold(raw.to_string(), |value, v| v(&value))
    })
}

pub fn trim() -> Validator {
    validator(|raw| Ok(raw.trim().to_string()))
}

pub fn required(message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |raw| {
        if raw.trim().is_empty() {
            Err(message.clone())
        } else {
            Ok(raw.to_string())
        }
    })
}

pub fn min_length(min: usize, message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |raw| {
        if raw.chars().count() < min {
            Err(message.clone())
        } else {
            Ok(raw.to_string())
        }
    })
}

pub fn max_length(max: usize, message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |raw| {
        if raw.chars().count() > max {
            Err(message.clone())
        } else {
            Ok(raw.to_string())
        }
    })
}

pub fn matches(pattern: Regex, message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |raw| {
        if pattern.is_match(raw) {
            Ok(raw.to_string())
        } else {
            Err(message.clone())
        }
    })
}

/// Accepts any of `options` case-insensitively and normalizes to the
/// option's canonical spelling.
pub fn one_of(options: &[&str], message: impl Into<String>) -> Validator {
    let options: Vec<String> = options.iter().map(|s| s.to_string()).collect();
    let message = message.into();
    validator(move |raw| {
        options
            .iter()
            .find(|opt| opt.eq_ignore_ascii_case(raw))
            .cloned()
            .ok_or_else(|| message.clone())
    })
}

/// Parses an integer within `[min, max]` and normalizes its rendering.
pub fn integer_range(min: i64, max: i64, message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |raw| match raw.trim().parse::<i64>() {
        Ok(n) if (min..=max).contains(&n) => Ok(n.to_string()),
        _ => Err(message.clone()),
    })
}

/// Empty values skip `inner` and pass through as empty.
pub fn optional(inner: Validator) -> Validator {
    validator(move |raw| {
        if raw.trim().is_empty() {
            Ok(String::new())
        } else {
            inner(raw)
        }
    })
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ObjectValidation {
    pub values: BTreeMap<String, String>,
    pub errors: BTreeMap<String, String>,
}

impl ObjectValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate every schema field of `input`.
///
/// Missing and null fields are validated as the empty string. Numbers and
/// booleans are stringified; arrays of scalars are joined with commas.
/// Fields outside the schema are ignored.
pub fn validate_object(input: &Value, schema: &[(&str, Validator)]) -> ObjectValidation {
    let mut out = ObjectValidation::default();
    let Some(obj) = input.as_object() else {
        out.errors
            .insert(ROOT_ERROR_KEY.to_string(), "expected an object".to_string());
        return out;
    };

    for (field, v) in schema {
        let raw = obj.get(*field).map(field_to_string).unwrap_or_default();
        match v(&raw) {
            Ok(value) => {
                out.values.insert(field.to_string(), value);
            }
            Err(message) => {
                out.errors.insert(field.to_string(), message);
            }
        }
    }
    out
}

fn field_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(field_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name_rule() -> Validator {
        compose_validators(vec![
            trim(),
            required("Name is required"),
            max_length(10, "Name is too long"),
        ])
    }

    #[test]
    fn compose_normalizes_before_later_checks() {
        let v = name_rule();
        assert_eq!(v("  Tadasana  ").unwrap(), "Tadasana");
        assert_eq!(v("  Vrksasana ").unwrap(), "Vrksasana");
    }

    #[test]
    fn compose_stops_at_first_error() {
        let v = name_rule();
        assert_eq!(v("   ").unwrap_err(), "Name is required");
        assert_eq!(v("Adho Mukha Svanasana").unwrap_err(), "Name is too long");
    }

    #[test]
    fn empty_composition_is_identity() {
        let v = compose_validators(vec![]);
        assert_eq!(v(" x ").unwrap(), " x ");
    }

    #[test]
    fn one_of_returns_canonical_option() {
        let v = one_of(&["Beginner", "Intermediate", "Advanced"], "Unknown level");
        assert_eq!(v("advanced").unwrap(), "Advanced");
        assert!(v("expert").is_err());
    }

    #[test]
    fn integer_range_checks_bounds() {
        let v = integer_range(-840, 840, "Offset out of range");
        assert_eq!(v(" -120 ").unwrap(), "-120");
        assert!(v("900").is_err());
        assert!(v("abc").is_err());
    }

    #[test]
    fn matches_and_min_length() {
        let v = compose_validators(vec![
            min_length(3, "Too short"),
            matches(Regex::new(r"^[a-z-]+$").unwrap(), "Lowercase only"),
        ]);
        assert_eq!(v("ab").unwrap_err(), "Too short");
        assert_eq!(v("Warrior").unwrap_err(), "Lowercase only");
        assert!(v("warrior-two").is_ok());
    }

    #[test]
    fn optional_skips_empty() {
        let v = optional(integer_range(1, 10, "Out of range"));
        assert_eq!(v("").unwrap(), "");
        assert!(v("11").is_err());
    }

    #[test]
    fn validate_object_collects_values_and_errors() {
        let schema = [
            ("name", name_rule()),
            ("duration", integer_range(1, 180, "Duration must be 1-180")),
            ("level", one_of(&["Beginner", "Advanced"], "Unknown level")),
        ];
        let res = validate_object(
            &json!({"name": " Sun Salute ", "duration": 45, "level": "expert", "extra": true}),
            &schema,
        );
        assert!(!res.is_valid());
        assert_eq!(res.values.get("name").map(String::as_str), Some("Sun Salute"));
        assert_eq!(res.values.get("duration").map(String::as_str), Some("45"));
        assert_eq!(res.errors.get("level").map(String::as_str), Some("Unknown level"));
        assert!(!res.values.contains_key("extra"));
    }

    #[test]
    fn validate_object_treats_missing_as_empty() {
        let schema = [("name", name_rule())];
        let res = validate_object(&json!({"name": null}), &schema);
        assert_eq!(res.errors.get("name").map(String::as_str), Some("Name is required"));
        let res = validate_object(&json!({}), &schema);
        assert!(!res.is_valid());
    }

    #[test]
    fn validate_object_joins_arrays() {
        let schema = [("days", trim())];
        let res = validate_object(&json!({"days": ["mon", "wed"]}), &schema);
        assert_eq!(res.values.get("days").map(String::as_str), Some("mon,wed"));
    }

    #[test]
    fn validate_object_rejects_non_object() {
        let res = validate_object(&json!([1, 2]), &[("name", name_rule())]);
        assert!(res.errors.contains_key(ROOT_ERROR_KEY));
    }
}
