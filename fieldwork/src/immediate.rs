//! The synchronous engine: every chained call resolves its middleware
//! pipeline and commits before returning control.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::BuilderConfig;
use crate::core::pipeline::{self, Resolution};
use crate::core::store::StateCell;
use crate::error::BuildError;
use crate::middleware::Context;
use crate::record::Record;

/// Procedure building a nested field value. Invoked with a fresh child
/// builder and the parent handle.
pub type NestedFn =
    Box<dyn FnOnce(&mut ImmediateBuilder, &ImmediateBuilder) -> Result<(), BuildError>>;

/// Value handed to [`ImmediateBuilder::set`]: either a plain value or a
/// procedure that produces the value through a nested child builder.
pub enum FieldValue {
    Plain(Value),
    Nested(NestedFn),
}

impl FieldValue {
    /// Build this field's value with a nested child builder sharing the
    /// parent's configuration and root record.
    pub fn nested<F>(build: F) -> Self
    where
        F: FnOnce(&mut ImmediateBuilder, &ImmediateBuilder) -> Result<(), BuildError> + 'static,
    {
        Self::Nested(Box::new(build))
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Plain(Value::from(value))
    }
}

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        Self::Plain(record.into_value())
    }
}

/// The synchronous builder engine.
///
/// Each [`set`](Self::set) runs the full write pipeline and commits before
/// returning, so subsequent chained calls observe the update. Middleware
/// faults fail the call itself; cancellations are silent no-ops.
pub struct ImmediateBuilder {
    state: StateCell,
    root: StateCell,
    config: Arc<BuilderConfig>,
}

impl ImmediateBuilder {
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
        }
    }

    /// Child builder over an empty record, sharing this builder's
    /// configuration and root.
    fn child(&self) -> Self {
        Self {
            state: StateCell::new(Record::new()),
            root: self.root.clone(),
            config: Arc::clone(&self.config),
        }
    }

    /// Current value of `field`. No side effects.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.state.load().get(field).cloned()
    }

    /// Write `field` through the middleware pipeline and commit.
    ///
    /// A nested value is materialized first: the procedure runs over a fresh
    /// child builder, and the child's record becomes the incoming value. A
    /// cancelled write leaves the record untouched; the handle is returned
    /// either way for continued chaining.
    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, BuildError> {
        let incoming = match value.into() {
            FieldValue::Plain(value) => value,
            FieldValue::Nested(build) => self.materialize(field, build)?,
        };
        let ctx = Context {
            field: field.to_string(),
            record: self.state.load(),
            root: self.root.load(),
        };
        match pipeline::resolve_sync(&self.config, field, incoming, &ctx)? {
            Resolution::Cancelled => Ok(self),
            Resolution::Resolved(value) => {
                self.state.commit_field(field, value, self.config.immutable);
                debug!(field, "committed write");
                Ok(self)
            }
        }
    }

    fn materialize(&self, field: &str, build: NestedFn) -> Result<Value, BuildError> {
        let mut child = self.child();
        build(&mut child, self).map_err(|source| BuildError::Nested {
            field: field.to_string(),
            source: Box::new(source),
        })?;
        Ok(child.record().into_value())
    }

    /// Invoke `f` with the current record, purely for effect.
    pub fn tap(&mut self, f: impl FnOnce(&Record)) -> &mut Self {
        f(&self.state.load());
        self
    }

    /// Replace the whole record with `f`'s result, under the same copy
    /// policy as a field write.
    pub fn transform(&mut self, f: impl FnOnce(&Record) -> Record) -> &mut Self {
        let next = f(&self.state.load());
        self.state.replace(next, self.config.immutable);
        self
    }

    /// Latest committed record.
    ///
    /// The returned snapshot is only guaranteed frozen when the builder was
    /// configured immutable.
    pub fn snapshot(&self) -> Arc<Record> {
        self.state.load()
    }

    /// The shared root record (ancestor state, for nested builders).
    pub fn root(&self) -> Arc<Record> {
        self.root.load()
    }

    /// Clone of the current record.
    pub fn record(&self) -> Record {
        self.state.load().as_ref().clone()
    }

    /// Consume the handle, yielding the final record.
    pub fn into_record(self) -> Record {
        self.record()
    }
}

impl Default for ImmediateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ImmediateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmediateBuilder")
            .field("record", &self.state.load())
            .field("immutable", &self.config.immutable)
            .finish_non_exhaustive()
    }
}
