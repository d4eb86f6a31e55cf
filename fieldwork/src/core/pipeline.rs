//! Two-stage middleware resolution for a single field write.
//!
//! Every write runs the global pipeline first, then — only if the global
//! stage did not cancel — the written field's pipeline, seeded with the
//! global stage's output. Within a stage, entries run in registration order;
//! replacement values fold forward, a cancel stops everything, and a raised
//! fault aborts the whole write.

use serde_json::Value;
use tracing::{debug, trace};

use crate::config::BuilderConfig;
use crate::core::filter::applies;
use crate::error::{BuildError, MiddlewareError};
use crate::middleware::{Context, MiddlewareEntry, MiddlewareFn, Outcome};

/// Result of running a write through both pipeline stages.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolution {
    /// The write survived; commit this value.
    Resolved(Value),
    /// A middleware cancelled the write; nothing is committed.
    Cancelled,
}

/// Run both stages synchronously.
///
/// Deferred entries cannot run here; encountering one aborts the write with
/// [`BuildError::DeferredOutcome`].
pub(crate) fn resolve_sync(
    config: &BuilderConfig,
    field: &str,
    value: Value,
    ctx: &Context,
) -> Result<Resolution, BuildError> {
    let value = match run_stage_sync(&config.global, field, value, ctx)? {
        Resolution::Resolved(value) => value,
        Resolution::Cancelled => return Ok(Resolution::Cancelled),
    };
    run_stage_sync(config.field_entries(field), field, value, ctx)
}

/// Run both stages, awaiting deferred entries.
pub(crate) async fn resolve(
    config: &BuilderConfig,
    field: &str,
    value: Value,
    ctx: &Context,
) -> Result<Resolution, BuildError> {
    let value = match run_stage(&config.global, field, value, ctx).await? {
        Resolution::Resolved(value) => value,
        Resolution::Cancelled => return Ok(Resolution::Cancelled),
    };
    run_stage(config.field_entries(field), field, value, ctx).await
}

fn run_stage_sync(
    entries: &[MiddlewareEntry],
    field: &str,
    mut value: Value,
    ctx: &Context,
) -> Result<Resolution, BuildError> {
    for entry in entries {
        if !applies(entry, field) {
            trace!(field, middleware = entry.label(), "skipped by field scoping");
            continue;
        }
        let outcome = match &entry.func {
            MiddlewareFn::Sync(func) => func(field, &value, ctx),
            MiddlewareFn::Deferred(_) => {
                return Err(BuildError::DeferredOutcome {
                    field: field.to_string(),
                    middleware: entry.label().to_string(),
                });
            }
        };
        match fold_outcome(outcome, entry, field, &mut value)? {
            StageFlow::Continue => {}
            StageFlow::Cancelled => return Ok(Resolution::Cancelled),
        }
    }
    Ok(Resolution::Resolved(value))
}

async fn run_stage(
    entries: &[MiddlewareEntry],
    field: &str,
    mut value: Value,
    ctx: &Context,
) -> Result<Resolution, BuildError> {
    for entry in entries {
        if !applies(entry, field) {
            trace!(field, middleware = entry.label(), "skipped by field scoping");
            continue;
        }
        let outcome = match &entry.func {
            MiddlewareFn::Sync(func) => func(field, &value, ctx),
            MiddlewareFn::Deferred(func) => func(field, value.clone(), ctx.clone()).await,
        };
        match fold_outcome(outcome, entry, field, &mut value)? {
            StageFlow::Continue => {}
            StageFlow::Cancelled => return Ok(Resolution::Cancelled),
        }
    }
    Ok(Resolution::Resolved(value))
}

enum StageFlow {
    Continue,
    Cancelled,
}

fn fold_outcome(
    outcome: Result<Outcome, MiddlewareError>,
    entry: &MiddlewareEntry,
    field: &str,
    value: &mut Value,
) -> Result<StageFlow, BuildError> {
    match outcome {
        Ok(Outcome::Replace(next)) => {
            trace!(field, middleware = entry.label(), "replaced value");
            *value = next;
            Ok(StageFlow::Continue)
        }
        Ok(Outcome::Unchanged) => Ok(StageFlow::Continue),
        Ok(Outcome::Cancel) => {
            debug!(field, middleware = entry.label(), "write cancelled");
            Ok(StageFlow::Cancelled)
        }
        Err(source) => Err(BuildError::Middleware {
            field: field.to_string(),
            middleware: entry.label().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::record::Record;
    use crate::test_support::{cancel_all, counting, fail_with, replace_with};

    fn ctx(field: &str) -> Context {
        Context {
            field: field.to_string(),
            record: Arc::new(Record::new()),
            root: Arc::new(Record::new()),
        }
    }

    /// Replacement values fold forward through a stage in registration order.
    #[test]
    fn replacements_fold_in_registration_order() {
        let config = BuilderConfig::new()
            .with(replace_with("first", json!("a")))
            .with(MiddlewareEntry::sync("append", |_, value, _| {
                let s = value.as_str().unwrap_or_default();
                Ok(Outcome::Replace(json!(format!("{s}b"))))
            }));
        let resolved = resolve_sync(&config, "f", json!("seed"), &ctx("f")).expect("resolve");
        assert_eq!(resolved, Resolution::Resolved(json!("ab")));
    }

    /// An unchanged outcome keeps the value flowing to later entries.
    #[test]
    fn unchanged_keeps_current_value() {
        let hits = Arc::new(AtomicUsize::new(0));
        let config = BuilderConfig::new().with(counting("noop", Arc::clone(&hits)));
        let resolved = resolve_sync(&config, "f", json!(7), &ctx("f")).expect("resolve");
        assert_eq!(resolved, Resolution::Resolved(json!(7)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    /// A cancel in the global stage suppresses the field stage entirely.
    #[test]
    fn global_cancel_suppresses_field_stage() {
        let hits = Arc::new(AtomicUsize::new(0));
        let config = BuilderConfig::new()
            .with(cancel_all("veto"))
            .with_field("f", counting("scoped", Arc::clone(&hits)));
        let resolved = resolve_sync(&config, "f", json!(1), &ctx("f")).expect("resolve");
        assert_eq!(resolved, Resolution::Cancelled);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    /// The field stage is seeded with the global stage's output.
    #[test]
    fn field_stage_sees_global_output() {
        let config = BuilderConfig::new()
            .with(replace_with("global", json!(10)))
            .with_field(
                "f",
                MiddlewareEntry::sync("double", |_, value, _| {
                    let n = value.as_i64().unwrap_or_default();
                    Ok(Outcome::Replace(json!(n * 2)))
                }),
            );
        let resolved = resolve_sync(&config, "f", json!(1), &ctx("f")).expect("resolve");
        assert_eq!(resolved, Resolution::Resolved(json!(20)));
    }

    /// Entries scoped away from the written field are skipped.
    #[test]
    fn scoped_entries_are_skipped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let config =
            BuilderConfig::new().with(counting("scoped", Arc::clone(&hits)).only(["other"]));
        let resolved = resolve_sync(&config, "f", json!(1), &ctx("f")).expect("resolve");
        assert_eq!(resolved, Resolution::Resolved(json!(1)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    /// A raised fault aborts the write and carries the entry's label.
    #[test]
    fn fault_aborts_with_entry_label() {
        let config = BuilderConfig::new().with(fail_with("strict", "rejected"));
        let err = resolve_sync(&config, "f", json!(1), &ctx("f")).expect_err("fault");
        match err {
            BuildError::Middleware {
                field, middleware, ..
            } => {
                assert_eq!(field, "f");
                assert_eq!(middleware, "strict");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// The synchronous entry point refuses deferred entries.
    #[test]
    fn sync_resolution_rejects_deferred_entries() {
        let config = BuilderConfig::new().with(MiddlewareEntry::deferred(
            "later",
            |_, _, _| async { Ok(Outcome::Unchanged) },
        ));
        let err = resolve_sync(&config, "f", json!(1), &ctx("f")).expect_err("deferred");
        assert!(matches!(err, BuildError::DeferredOutcome { .. }));
    }

    /// The async entry point awaits deferred entries and folds their output.
    #[tokio::test]
    async fn async_resolution_awaits_deferred_entries() {
        let config = BuilderConfig::new()
            .with(MiddlewareEntry::deferred("upper", |_, value, _| async move {
                let s = value.as_str().unwrap_or_default().to_uppercase();
                Ok(Outcome::Replace(json!(s)))
            }))
            .with(replace_with("suffix", json!("done")));
        let resolved = resolve(&config, "f", json!("hi"), &ctx("f"))
            .await
            .expect("resolve");
        assert_eq!(resolved, Resolution::Resolved(json!("done")));
    }
}
