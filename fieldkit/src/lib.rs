//! Ready-made middleware for `fieldwork` builders.
//!
//! Everything here is an ordinary pure function returning a
//! [`MiddlewareEntry`](fieldwork::middleware::MiddlewareEntry); scope an
//! entry to specific fields with its `only`/`except` builders. The kit has
//! two halves:
//!
//! - **[`transform`]**: normalize incoming values (trimming, case mapping,
//!   numeric coercion, defaulting).
//! - **[`validate`]**: reject or veto incoming values (required fields,
//!   length and range bounds, pattern matching, value sets).

pub mod transform;
pub mod validate;
