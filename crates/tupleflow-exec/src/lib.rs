#![forbid(unsafe_code)]
//! tupleflow-exec: the in-repo stand-in for the external scheduler.
//!
//! Drives operator instances through the push/pull protocol, fans a scan out
//! across disjoint byte ranges (one instance per worker), and wires the
//! local→global two-stage aggregate merge. Operators know nothing about this
//! topology.

pub mod driver;
pub mod partition;

pub use driver::{
    drive_join, drive_unary, partition_tuples, run_scan_partitioned, run_two_stage_aggregate,
    split_byte_range, BytePartition, ExecError, ExecResult,
};
pub use partition::partition_index;
