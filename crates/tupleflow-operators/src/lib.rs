#![forbid(unsafe_code)]
//! tupleflow-operators: the hybrid push/pull operator protocol and its
//! concrete operators (scan/filter/project/hash-join/group-by).
//!
//! Design intent:
//! - Each operator instance is single-threaded and non-reentrant; parallelism
//!   lives across instances, never inside one.
//! - State transitions are guarded at runtime; a call invalid for the current
//!   state raises `Error::Protocol` instead of corrupting output.

pub mod filter;
pub mod group_by;
pub mod join;
pub mod project;
pub mod scan;
pub mod traits;

pub use traits::{Operator, OperatorState};
