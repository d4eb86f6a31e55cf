//! Test-only helpers: deterministic records and canned middleware.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::error::MiddlewareError;
use crate::middleware::{MiddlewareEntry, Outcome};
use crate::record::Record;

/// Record built from literal field/value pairs.
pub fn record_of<I>(fields: I) -> Record
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let mut record = Record::new();
    for (field, value) in fields {
        record.insert(field, value);
    }
    record
}

/// Middleware that passes every value through and counts its invocations.
pub fn counting(label: &str, hits: Arc<AtomicUsize>) -> MiddlewareEntry {
    MiddlewareEntry::sync(label, move |_, _, _| {
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(Outcome::Unchanged)
    })
}

/// Middleware that replaces every value with `value`.
pub fn replace_with(label: &str, value: Value) -> MiddlewareEntry {
    MiddlewareEntry::sync(label, move |_, _, _| Ok(Outcome::Replace(value.clone())))
}

/// Middleware that cancels every write.
pub fn cancel_all(label: &str) -> MiddlewareEntry {
    MiddlewareEntry::sync(label, |_, _, _| Ok(Outcome::Cancel))
}

/// Middleware that fails every write with `message`.
pub fn fail_with(label: &str, message: &str) -> MiddlewareEntry {
    let message = message.to_string();
    MiddlewareEntry::sync(label, move |_, _, _| {
        Err(MiddlewareError::new(message.clone()))
    })
}

/// Deferred middleware that sleeps for `delay` and passes the value through.
pub fn delayed_passthrough(label: &str, delay: Duration) -> MiddlewareEntry {
    MiddlewareEntry::deferred(label, move |_, _, _| async move {
        tokio::time::sleep(delay).await;
        Ok(Outcome::Unchanged)
    })
}

/// Deferred middleware that sleeps for `delay` and then replaces every value
/// with `value`.
pub fn delayed_replace(label: &str, delay: Duration, value: Value) -> MiddlewareEntry {
    MiddlewareEntry::deferred(label, move |_, _, _| {
        let value = value.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(Outcome::Replace(value))
        }
    })
}
