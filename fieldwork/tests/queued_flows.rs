//! End-to-end flows for the queued engine: strict ordering under awaiting
//! middleware, the continue-past-failure policy, and nested composition.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use fieldwork::config::BuilderConfig;
use fieldwork::error::BuildError;
use fieldwork::middleware::{MiddlewareEntry, Outcome};
use fieldwork::queued::{QueuedBuilder, QueuedValue};
use fieldwork::record::Record;
use fieldwork::test_support::delayed_passthrough;

/// Middleware that sleeps for a per-field duration and records completion
/// order. Earlier fields sleep longest, so any interleaving would complete
/// them out of append order.
fn staggered(log: Arc<Mutex<Vec<String>>>) -> MiddlewareEntry {
    MiddlewareEntry::deferred("staggered", move |field, _, _| {
        let log = Arc::clone(&log);
        let field = field.to_string();
        async move {
            let index: u64 = field[1..].parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis((5 - index) * 10)).await;
            log.lock().expect("log lock").push(field);
            Ok(Outcome::Unchanged)
        }
    })
}

/// N writes whose middleware suspends for varying durations drain to all N
/// applied strictly in append order, never interleaved or reordered.
#[tokio::test]
async fn suspending_writes_apply_in_append_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let config = BuilderConfig::new().with(staggered(Arc::clone(&log)));
    let mut builder = QueuedBuilder::with(Record::new(), config);

    for index in 0..5 {
        builder.set(format!("f{index}"), json!(index));
    }
    let record = builder.drain().await.expect("drain");

    let order = log.lock().expect("log lock").clone();
    assert_eq!(order, vec!["f0", "f1", "f2", "f3", "f4"]);
    for index in 0..5 {
        assert_eq!(record.get(&format!("f{index}")), Some(&json!(index)));
    }
}

/// A write cancelled by an awaiting middleware is dropped silently; a later
/// write to the same field wins.
#[tokio::test]
async fn awaited_cancel_drops_only_that_write() {
    let config = BuilderConfig::new().with(
        MiddlewareEntry::deferred("reserved-check", |_, value, _| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(match value.as_str() {
                Some("alice") => Outcome::Cancel,
                _ => Outcome::Unchanged,
            })
        })
        .only(["username"]),
    );
    let mut builder = QueuedBuilder::with(Record::new(), config);
    builder.set("username", "alice").set("username", "bob");

    let record = builder.drain().await.expect("drain");
    assert_eq!(record.to_value(), json!({ "username": "bob" }));
}

/// A failing task does not stop the chain: later writes still run against
/// the last good record and drain surfaces the first failure.
#[tokio::test]
async fn failing_task_does_not_abort_the_chain() {
    let config = BuilderConfig::new()
        .with(delayed_passthrough("slow", Duration::from_millis(5)))
        .with(
            MiddlewareEntry::sync("strict", |field, _, _| {
                Err(fieldwork::error::MiddlewareError::new(format!(
                    "'{field}' rejected"
                )))
            })
            .only(["bad"]),
        );
    let mut builder = QueuedBuilder::with(Record::new(), config);
    builder.set("early", 1).set("bad", 2).set("late", 3);

    let err = builder.drain().await.expect_err("drain fails");
    assert!(matches!(err, BuildError::Middleware { .. }));
    assert_eq!(builder.get("early"), Some(json!(1)));
    assert_eq!(builder.get("bad"), None);
    assert_eq!(builder.get("late"), Some(json!(3)));
}

/// Reads before a drain do not observe queued-but-unexecuted writes.
#[tokio::test]
async fn reads_before_drain_are_stale() {
    let config =
        BuilderConfig::new().with(delayed_passthrough("slow", Duration::from_millis(5)));
    let mut builder = QueuedBuilder::with(Record::new(), config);

    builder.set("name", "Alice");
    assert_eq!(builder.get("name"), None);

    builder.drain().await.expect("drain");
    assert_eq!(builder.get("name"), Some(json!("Alice")));
}

/// A nested child's queued writes drain inside the parent's task; the
/// committed field value is the fully resolved child record.
#[tokio::test]
async fn nested_child_drains_inside_parent_task() {
    let config =
        BuilderConfig::new().with(delayed_passthrough("slow", Duration::from_millis(2)));
    let mut builder = QueuedBuilder::with(Record::new(), config);
    builder.set(
        "address",
        QueuedValue::nested(|child, _| {
            child.set("city", "Lisbon").set("zip", "1000");
        }),
    );

    let record = builder.drain().await.expect("drain");
    assert_eq!(
        record.get("address"),
        Some(&json!({ "city": "Lisbon", "zip": "1000" }))
    );
}

/// The nested procedure receives the parent record as of task run time, so
/// it observes writes that were queued before it.
#[tokio::test]
async fn nested_procedure_sees_parent_record_at_run_time() {
    let mut builder = QueuedBuilder::new();
    builder.set("plan", "pro").set(
        "limits",
        QueuedValue::nested(|child, parent| {
            let plan = parent.get("plan").cloned().unwrap_or(Value::Null);
            child.set("plan_ref", plan);
        }),
    );

    let record = builder.drain().await.expect("drain");
    assert_eq!(record.get("limits"), Some(&json!({ "plan_ref": "pro" })));
}

/// A failing nested child surfaces as a nested error on the parent's task
/// and commits nothing for the field.
#[tokio::test]
async fn nested_child_failure_surfaces_through_drain() {
    let config = BuilderConfig::new().with(
        MiddlewareEntry::sync("strict", |field, _, _| {
            Err(fieldwork::error::MiddlewareError::new(format!(
                "'{field}' rejected"
            )))
        })
        .only(["inner"]),
    );
    let mut builder = QueuedBuilder::with(Record::new(), config);
    builder.set(
        "outer",
        QueuedValue::nested(|child, _| {
            child.set("inner", 1);
        }),
    );

    let err = builder.drain().await.expect_err("drain fails");
    assert!(matches!(err, BuildError::Nested { .. }));
    assert_eq!(builder.get("outer"), None);
}

/// Immutable mode carries through the queued engine: a snapshot taken
/// between drains is frozen with respect to later writes.
#[tokio::test]
async fn immutable_snapshots_survive_later_drains() {
    let mut builder = QueuedBuilder::with(Record::new(), BuilderConfig::new().immutable(true));
    builder.set("name", "Alice");
    builder.drain().await.expect("first drain");
    let snapshot = builder.snapshot();

    builder.set("age", 42);
    builder.drain().await.expect("second drain");

    assert_eq!(snapshot.get("age"), None);
    assert_eq!(builder.get("age"), Some(json!(42)));
}
