#![forbid(unsafe_code)]
//! tupleflow-io: byte-range sources, the block reader, and sink writers.
//!
//! The block reader is the unit of parallel scanning: each worker tokenizes
//! one non-overlapping byte range of a delimited file and together the
//! workers produce exactly the records a sequential scan would.

pub mod block;
pub mod source;
pub mod writers;

pub use block::BlockReader;
pub use source::{ByteSource, FsSource, MemSource};
