#![forbid(unsafe_code)]
//! Facade crate re-exporting the tupleflow engine workspace.
//!
//! The engine itself lives in the member crates; this crate exists so
//! embedders (and the integration tests) can depend on one name.

pub use tupleflow_core as core;
pub use tupleflow_exec as exec;
pub use tupleflow_io as io;
pub use tupleflow_operators as operators;
