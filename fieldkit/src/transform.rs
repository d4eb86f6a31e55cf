//! Transformers: middleware that normalizes incoming values.

use fieldwork::error::MiddlewareError;
use fieldwork::middleware::{MiddlewareEntry, Outcome};
use serde_json::Value;

/// Trim surrounding whitespace from string values; other types pass
/// through.
pub fn trim() -> MiddlewareEntry {
    MiddlewareEntry::sync("trim", |_, value, _| {
        Ok(match value.as_str() {
            Some(s) => Outcome::Replace(Value::from(s.trim())),
            None => Outcome::Unchanged,
        })
    })
}

/// Lowercase string values.
pub fn lowercase() -> MiddlewareEntry {
    MiddlewareEntry::sync("lowercase", |_, value, _| {
        Ok(match value.as_str() {
            Some(s) => Outcome::Replace(Value::from(s.to_lowercase())),
            None => Outcome::Unchanged,
        })
    })
}

/// Uppercase string values.
pub fn uppercase() -> MiddlewareEntry {
    MiddlewareEntry::sync("uppercase", |_, value, _| {
        Ok(match value.as_str() {
            Some(s) => Outcome::Replace(Value::from(s.to_uppercase())),
            None => Outcome::Unchanged,
        })
    })
}

/// Coerce string values to numbers.
///
/// Integer-shaped strings become integers, the rest become floats. Numbers
/// pass through unchanged; everything else fails the write.
pub fn to_number() -> MiddlewareEntry {
    MiddlewareEntry::sync("to_number", |field, value, _| match value {
        Value::Number(_) => Ok(Outcome::Unchanged),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Ok(Outcome::Replace(Value::from(n)))
            } else if let Ok(n) = s.parse::<f64>()
                && n.is_finite()
            {
                Ok(Outcome::Replace(Value::from(n)))
            } else {
                Err(MiddlewareError::new(format!(
                    "field '{field}' is not numeric: {s:?}"
                )))
            }
        }
        _ => Err(MiddlewareError::new(format!(
            "field '{field}' cannot be coerced to a number"
        ))),
    })
}

/// Replace null values with `fallback`.
pub fn default_value(fallback: Value) -> MiddlewareEntry {
    MiddlewareEntry::sync("default_value", move |_, value, _| {
        Ok(if value.is_null() {
            Outcome::Replace(fallback.clone())
        } else {
            Outcome::Unchanged
        })
    })
}
