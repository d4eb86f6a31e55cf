//! The asynchronous engine: every chained call appends a unit of work to a
//! strictly-ordered task chain and returns immediately; [`drain`] runs the
//! chain one task at a time, so an awaiting middleware in task *n* delays
//! task *n+1* and no two tasks' middleware interleave.
//!
//! [`drain`]: QueuedBuilder::drain

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BuilderConfig;
use crate::core::pipeline::{self, Resolution};
use crate::core::store::StateCell;
use crate::error::BuildError;
use crate::middleware::Context;
use crate::record::Record;

/// One deferred unit of work on the task chain.
type Task = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BuildError>> + Send>;

/// Procedure building a nested field value inside a queued task. Invoked
/// with a fresh child builder and the parent's record as of task run time.
pub type QueuedNestedFn = Box<dyn FnOnce(&mut QueuedBuilder, Arc<Record>) + Send>;

/// Value handed to [`QueuedBuilder::set`]: either a plain value or a
/// procedure that produces the value through a nested child builder.
pub enum QueuedValue {
    Plain(Value),
    Nested(QueuedNestedFn),
}

impl QueuedValue {
    /// Build this field's value with a nested child builder sharing the
    /// parent's configuration and root record. The child's queued writes are
    /// drained inside the parent's task, before the field's own middleware
    /// pass.
    pub fn nested<F>(build: F) -> Self
    where
        F: FnOnce(&mut QueuedBuilder, Arc<Record>) + Send + 'static,
    {
        Self::Nested(Box::new(build))
    }
}

impl From<Value> for QueuedValue {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl From<&str> for QueuedValue {
    fn from(value: &str) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<String> for QueuedValue {
    fn from(value: String) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<bool> for QueuedValue {
    fn from(value: bool) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<i32> for QueuedValue {
    fn from(value: i32) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<i64> for QueuedValue {
    fn from(value: i64) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<u64> for QueuedValue {
    fn from(value: u64) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<f64> for QueuedValue {
    fn from(value: f64) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<Record> for QueuedValue {
    fn from(record: Record) -> Self {
        Self::Plain(record.into_value())
    }
}

/// The asynchronous builder engine.
///
/// `set` appends a task and returns the handle without running any
/// middleware, so callers chain field accesses in the order they should
/// logically apply even when individual writes await. Reads before a drain
/// see only the writes that have already executed; [`drain`](Self::drain)
/// is the authoritative accessor.
pub struct QueuedBuilder {
    state: StateCell,
    root: StateCell,
    config: Arc<BuilderConfig>,
    chain: Vec<Option<Task>>,
    cursor: usize,
}

impl QueuedBuilder {
    /// Builder over an empty record with no middleware.
    pub fn new() -> Self {
        Self::with(Record::new(), BuilderConfig::default())
    }

    /// Builder over `initial` with the given configuration.
    pub fn with(initial: Record, config: BuilderConfig) -> Self {
        let state = StateCell::new(initial);
        Self {
            root: state.clone(),
            state,
            config: Arc::new(config),
            chain: Vec::new(),
            cursor: 0,
        }
    }

    fn child_of(root: &StateCell, config: &Arc<BuilderConfig>) -> Self {
        Self {
            state: StateCell::new(Record::new()),
            root: root.clone(),
            config: Arc::clone(config),
            chain: Vec::new(),
            cursor: 0,
        }
    }

    /// Append a write for `field` to the task chain.
    ///
    /// The task runs the full middleware pass against whatever record is
    /// current when its turn arrives, not the record as of this call. A
    /// failing task is captured and surfaces through `drain`.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<QueuedValue>) -> &mut Self {
        let field = field.into();
        let value = value.into();
        let state = self.state.clone();
        let root = self.root.clone();
        let config = Arc::clone(&self.config);
        self.chain.push(Some(Box::new(move || {
            Box::pin(run_write(state, root, config, field, value))
        })));
        self
    }

    /// Best-effort read of the record as committed so far.
    ///
    /// A read immediately after `set` does not reflect that write until its
    /// task has run.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.state.load().get(field).cloned()
    }

    /// Append a task invoking `f` with the record as of its turn, purely
    /// for effect.
    pub fn tap(&mut self, f: impl FnOnce(&Record) + Send + 'static) -> &mut Self {
        let state = self.state.clone();
        self.chain.push(Some(Box::new(move || {
            Box::pin(async move {
                f(&state.load());
                Ok(())
            })
        })));
        self
    }

    /// Append a task replacing the whole record with `f`'s result, under the
    /// same copy policy as a field write.
    pub fn transform(&mut self, f: impl FnOnce(&Record) -> Record + Send + 'static) -> &mut Self {
        let state = self.state.clone();
        let immutable = self.config.immutable;
        self.chain.push(Some(Box::new(move || {
            Box::pin(async move {
                let next = f(&state.load());
                state.replace(next, immutable);
                Ok(())
            })
        })));
        self
    }

    /// Snapshot of the record as committed so far (same caveat as
    /// [`get`](Self::get)).
    pub fn snapshot(&self) -> Arc<Record> {
        self.state.load()
    }

    /// The shared root record (ancestor state, for nested builders).
    pub fn root(&self) -> Arc<Record> {
        self.root.load()
    }

    /// Run every task appended so far, strictly one at a time in append
    /// order, and yield the final record.
    ///
    /// A failing task is logged and captured; later tasks still run against
    /// the last good record, and the first captured failure is returned once
    /// the chain is exhausted. Draining again after appending more tasks
    /// runs only the tasks appended since.
    pub async fn drain(&mut self) -> Result<Record, BuildError> {
        let mut first_failure = None;
        while self.cursor < self.chain.len() {
            let index = self.cursor;
            self.cursor += 1;
            let Some(task) = self.chain[index].take() else {
                continue;
            };
            if let Err(error) = task().await {
                warn!(task = index, error = %error, "queued task failed");
                first_failure.get_or_insert(error);
            }
        }
        match first_failure {
            Some(error) => Err(error),
            None => Ok(self.state.load().as_ref().clone()),
        }
    }
}

impl Default for QueuedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueuedBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedBuilder")
            .field("record", &self.state.load())
            .field("immutable", &self.config.immutable)
            .field("pending", &(self.chain.len() - self.cursor))
            .finish_non_exhaustive()
    }
}

/// Body of a queued field write: materialize a nested value, resolve the
/// middleware pass, commit.
async fn run_write(
    state: StateCell,
    root: StateCell,
    config: Arc<BuilderConfig>,
    field: String,
    value: QueuedValue,
) -> Result<(), BuildError> {
    let incoming = match value {
        QueuedValue::Plain(value) => value,
        QueuedValue::Nested(build) => {
            let mut child = QueuedBuilder::child_of(&root, &config);
            build(&mut child, state.load());
            let record = child.drain().await.map_err(|source| BuildError::Nested {
                field: field.clone(),
                source: Box::new(source),
            })?;
            record.into_value()
        }
    };
    let ctx = Context {
        field: field.clone(),
        record: state.load(),
        root: root.load(),
    };
    match pipeline::resolve(&config, &field, incoming, &ctx).await? {
        Resolution::Cancelled => Ok(()),
        Resolution::Resolved(value) => {
            state.commit_field(&field, value, config.immutable);
            debug!(field, "committed queued write");
            Ok(())
        }
    }
}
