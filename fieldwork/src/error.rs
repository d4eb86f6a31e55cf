//! Typed errors for the write pipeline and engines.

use thiserror::Error;

/// Fault raised by a middleware entry (e.g. a validation violation).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MiddlewareError {
    message: String,
}

impl MiddlewareError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure surfaced by a builder operation.
///
/// Cancellation is not represented here: a cancelled write is a silent no-op
/// and the chain continues.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A middleware entry raised a fault; the write was aborted.
    #[error("middleware '{middleware}' failed for field '{field}': {source}")]
    Middleware {
        field: String,
        middleware: String,
        source: MiddlewareError,
    },

    /// A deferred middleware entry reached the immediate engine, which
    /// cannot await it.
    #[error(
        "middleware '{middleware}' for field '{field}' is deferred; \
         immediate builders only run synchronous middleware"
    )]
    DeferredOutcome { field: String, middleware: String },

    /// The nested builder for a field failed.
    #[error("nested builder for field '{field}' failed: {source}")]
    Nested {
        field: String,
        source: Box<BuildError>,
    },
}
