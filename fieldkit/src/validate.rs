//! Validators: middleware that rejects or vetoes incoming values.

use std::collections::BTreeSet;

use fieldwork::error::MiddlewareError;
use fieldwork::middleware::{MiddlewareEntry, Outcome};
use regex::Regex;
use serde_json::Value;

/// Fail null and empty-string values.
pub fn required() -> MiddlewareEntry {
    MiddlewareEntry::sync("required", |field, value, _| {
        let missing = value.is_null() || value.as_str().is_some_and(str::is_empty);
        if missing {
            Err(MiddlewareError::new(format!("field '{field}' is required")))
        } else {
            Ok(Outcome::Unchanged)
        }
    })
}

/// Fail string values shorter than `min` characters.
pub fn min_len(min: usize) -> MiddlewareEntry {
    MiddlewareEntry::sync("min_len", move |field, value, _| match value.as_str() {
        Some(s) if s.chars().count() < min => Err(MiddlewareError::new(format!(
            "field '{field}' must be at least {min} characters"
        ))),
        _ => Ok(Outcome::Unchanged),
    })
}

/// Fail string values longer than `max` characters.
pub fn max_len(max: usize) -> MiddlewareEntry {
    MiddlewareEntry::sync("max_len", move |field, value, _| match value.as_str() {
        Some(s) if s.chars().count() > max => Err(MiddlewareError::new(format!(
            "field '{field}' must be at most {max} characters"
        ))),
        _ => Ok(Outcome::Unchanged),
    })
}

/// Fail string values not matching `pattern`.
///
/// Fails at construction time when the pattern itself is invalid.
pub fn matches(pattern: &str) -> Result<MiddlewareEntry, regex::Error> {
    let pattern = Regex::new(pattern)?;
    Ok(MiddlewareEntry::sync(
        "matches",
        move |field, value, _| match value.as_str() {
            Some(s) if !pattern.is_match(s) => Err(MiddlewareError::new(format!(
                "field '{field}' does not match {:?}",
                pattern.as_str()
            ))),
            _ => Ok(Outcome::Unchanged),
        },
    ))
}

/// Fail values outside the allowed set.
pub fn one_of(values: impl IntoIterator<Item = Value>) -> MiddlewareEntry {
    let allowed: Vec<Value> = values.into_iter().collect();
    MiddlewareEntry::sync("one_of", move |field, value, _| {
        if allowed.contains(value) {
            Ok(Outcome::Unchanged)
        } else {
            Err(MiddlewareError::new(format!(
                "field '{field}' is not an allowed value"
            )))
        }
    })
}

/// Silently drop writes whose string value is in the reserved set.
///
/// This is the veto counterpart to [`one_of`]: the write is cancelled, not
/// failed, so the chain continues and a later write to the field can still
/// land.
pub fn reserved<I, S>(values: I) -> MiddlewareEntry
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let reserved: BTreeSet<String> = values.into_iter().map(Into::into).collect();
    MiddlewareEntry::sync("reserved", move |_, value, _| {
        Ok(match value.as_str() {
            Some(s) if reserved.contains(s) => Outcome::Cancel,
            _ => Outcome::Unchanged,
        })
    })
}

/// Fail numeric values outside `[min, max]`.
pub fn range(min: f64, max: f64) -> MiddlewareEntry {
    MiddlewareEntry::sync("range", move |field, value, _| match value.as_f64() {
        Some(n) if n < min || n > max => Err(MiddlewareError::new(format!(
            "field '{field}' must be between {min} and {max}"
        ))),
        _ => Ok(Outcome::Unchanged),
    })
}
