#![forbid(unsafe_code)]
//! tupleflow-core: the tuple/schema model, link identities, errors, and config.
//!
//! Design intent:
//! - Pure data and validation; no I/O, no threads, no operator logic.
//! - Everything serde-serializable so schemas and configs can cross process
//!   boundaries.

pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod tuple;
