//! Middleware contract: entries, outcomes, and the per-write context.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::MiddlewareError;
use crate::record::Record;

/// What a middleware invocation did with the incoming value.
#[derive(Debug)]
pub enum Outcome {
    /// Use this value for the rest of the pipeline.
    Replace(Value),
    /// Keep the current value.
    Unchanged,
    /// Drop the write entirely; no later pipeline stage runs and nothing is
    /// committed. Not an error.
    Cancel,
}

/// Read-only snapshot handed to each middleware invocation.
#[derive(Clone)]
pub struct Context {
    /// Field name being written.
    pub field: String,
    /// The record as it stood when the write began.
    pub record: Arc<Record>,
    /// The shared root record (ancestor state for nested builders).
    pub root: Arc<Record>,
}

/// Synchronous middleware callable: `(field, value, context) -> outcome`.
pub type SyncFn =
    dyn Fn(&str, &Value, &Context) -> Result<Outcome, MiddlewareError> + Send + Sync;

/// Deferred middleware callable. The returned future must own what it needs;
/// the field name is available as an owned string via `context.field`.
pub type DeferredFn = dyn Fn(&str, Value, Context) -> BoxFuture<'static, Result<Outcome, MiddlewareError>>
    + Send
    + Sync;

pub(crate) enum MiddlewareFn {
    Sync(Arc<SyncFn>),
    Deferred(Arc<DeferredFn>),
}

impl Clone for MiddlewareFn {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(func) => Self::Sync(Arc::clone(func)),
            Self::Deferred(func) => Self::Deferred(Arc::clone(func)),
        }
    }
}

/// One step of the write pipeline: a labelled callable plus optional
/// field-name scoping.
///
/// Entries are cheap to clone and shared between a builder, its nested
/// children, and queued tasks.
#[derive(Clone)]
pub struct MiddlewareEntry {
    pub(crate) label: String,
    pub(crate) func: MiddlewareFn,
    pub(crate) only: Option<BTreeSet<String>>,
    pub(crate) except: Option<BTreeSet<String>>,
}

impl MiddlewareEntry {
    /// Entry backed by a synchronous callable. Runs in both engines.
    pub fn sync<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &Value, &Context) -> Result<Outcome, MiddlewareError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: MiddlewareFn::Sync(Arc::new(func)),
            only: None,
            except: None,
        }
    }

    /// Entry backed by a deferred callable. Only queued builders can run it;
    /// the immediate engine fails such a write with
    /// [`BuildError::DeferredOutcome`](crate::error::BuildError::DeferredOutcome).
    pub fn deferred<F, Fut>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, Value, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, MiddlewareError>> + Send + 'static,
    {
        let boxed = move |field: &str,
                          value: Value,
                          ctx: Context|
              -> BoxFuture<'static, Result<Outcome, MiddlewareError>> {
            Box::pin(func(field, value, ctx))
        };
        Self {
            label: label.into(),
            func: MiddlewareFn::Deferred(Arc::new(boxed)),
            only: None,
            except: None,
        }
    }

    /// Restrict the entry to exactly these fields.
    pub fn only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Suppress the entry for these fields. Wins over `only` when a field
    /// appears in both sets.
    pub fn except<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Label used in errors and trace events.
    pub fn label(&self) -> &str {
        &self.label
    }
}
