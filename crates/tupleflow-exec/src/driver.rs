//! Sequential and partitioned drivers for operator graphs.
//!
//! Each worker owns an independent operator instance; there is no shared
//! mutable state across instances of the same logical operator. The drive
//! loops drain the pull side after every `accept` so a per-outer probe match
//! set is never dropped by the driver itself.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, trace};

use tupleflow_core::error::Error as CoreError;
use tupleflow_core::id::LinkId;
use tupleflow_core::prelude::EngineConfig;
use tupleflow_core::schema::Schema;
use tupleflow_core::tuple::Tuple;
use tupleflow_io::source::ByteSource;
use tupleflow_operators::scan::{Scan, ScanConfig};
use tupleflow_operators::traits::Operator;

use crate::partition::partition_index;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("worker {0} panicked")]
    Worker(usize),

    #[error("workflow rejected: {0}")]
    Workflow(String),
}

pub type ExecResult<T> = std::result::Result<T, ExecError>;

/// One worker's byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytePartition {
    pub start: u64,
    pub end: u64,
}

/// Split `[0, len)` into at most `workers` adjacent non-empty ranges (the
/// last absorbs the remainder).
pub fn split_byte_range(len: u64, workers: usize) -> Vec<BytePartition> {
    let workers = (workers.max(1) as u64).min(len.max(1));
    let chunk = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i == workers - 1 { len } else { (i + 1) * chunk };
            BytePartition { start, end }
        })
        .collect()
}

/// Drive one scan instance over each byte partition on its own worker thread,
/// collecting per-worker output in partition order.
pub fn run_scan_partitioned(
    source: Arc<dyn ByteSource>,
    schema: &Arc<Schema>,
    delimiter: u8,
    keep: Option<HashSet<usize>>,
    config: &EngineConfig,
) -> ExecResult<Vec<Vec<Tuple>>> {
    let len = source.len().map_err(CoreError::from)?;
    let parts = split_byte_range(len, config.max_parallel_workers);
    let chunk_bytes = config.read_chunk_bytes;
    debug!(partitions = parts.len(), bytes = len, "starting partitioned scan");

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(parts.len());
        for (worker, part) in parts.iter().copied().enumerate() {
            let source = Arc::clone(&source);
            let schema = Arc::clone(schema);
            let keep = keep.clone();
            handles.push(scope.spawn(move || -> ExecResult<Vec<Tuple>> {
                let mut scan = Scan::new(
                    source,
                    ScanConfig {
                        schema,
                        delimiter,
                        start: part.start,
                        end: part.end,
                        keep,
                        chunk_bytes,
                    },
                );
                scan.initialize()?;
                let mut out = Vec::new();
                while scan.has_next()? {
                    out.push(scan.next()?);
                }
                scan.dispose()?;
                trace!(worker, tuples = out.len(), "scan partition finished");
                Ok(out)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(worker_result) => results.push(worker_result?),
                Err(_) => return Err(ExecError::Worker(worker)),
            }
        }
        Ok(results)
    })
}

/// Push every tuple of `input` into an initialized `op` over `link`, draining
/// the pull side as results appear; finishes with the exhaustion signal,
/// `no_more`, and a final drain. The caller owns `initialize`/`dispose`.
pub fn drive_unary(
    op: &mut dyn Operator,
    link: LinkId,
    input: impl IntoIterator<Item = Tuple>,
) -> ExecResult<Vec<Tuple>> {
    let mut out = Vec::new();
    op.on_upstream_changed(link);
    for tuple in input {
        op.accept(tuple)?;
        drain(op, &mut out)?;
    }
    op.on_upstream_exhausted(link)?;
    op.no_more()?;
    drain(op, &mut out)?;
    trace!(operator = op.name(), produced = out.len(), "operator drained");
    Ok(out)
}

/// Drive an initialized binary operator: the build (inner) side runs to
/// exhaustion before the first probe-side accept, matching the hash join's
/// ordering contract.
pub fn drive_join(
    op: &mut dyn Operator,
    inner_link: LinkId,
    inner: impl IntoIterator<Item = Tuple>,
    outer_link: LinkId,
    outer: impl IntoIterator<Item = Tuple>,
) -> ExecResult<Vec<Tuple>> {
    let mut out = Vec::new();

    op.on_upstream_changed(inner_link);
    for tuple in inner {
        op.accept(tuple)?;
    }
    op.on_upstream_exhausted(inner_link)?;

    op.on_upstream_changed(outer_link);
    for tuple in outer {
        op.accept(tuple)?;
        // Drain per outer tuple: a replaced probe cursor would drop matches.
        drain(op, &mut out)?;
    }
    op.on_upstream_exhausted(outer_link)?;
    op.no_more()?;
    drain(op, &mut out)?;
    Ok(out)
}

/// Two-stage aggregation: one local instance per partition feeding a single
/// global instance downstream; both follow the identical protocol and know
/// nothing about the topology.
pub fn run_two_stage_aggregate(
    partitions: Vec<Vec<Tuple>>,
    mut locals: Vec<Box<dyn Operator>>,
    global: &mut dyn Operator,
    local_link: LinkId,
    global_link: LinkId,
) -> ExecResult<Vec<Tuple>> {
    if locals.len() != partitions.len() {
        return Err(ExecError::Workflow(format!(
            "{} local instances for {} partitions",
            locals.len(),
            partitions.len()
        )));
    }

    let mut partials = Vec::new();
    for (local, tuples) in locals.iter_mut().zip(partitions) {
        local.initialize()?;
        partials.extend(drive_unary(local.as_mut(), local_link, tuples)?);
        local.dispose()?;
    }
    debug!(partials = partials.len(), "local aggregation stages complete");

    global.initialize()?;
    let out = drive_unary(global, global_link, partials)?;
    global.dispose()?;
    Ok(out)
}

/// Route tuples into `num_partitions` disjoint groups by hashing the key at
/// `key_ordinal`; equal keys always land in the same group.
pub fn partition_tuples(
    tuples: Vec<Tuple>,
    key_ordinal: usize,
    num_partitions: usize,
) -> ExecResult<Vec<Vec<Tuple>>> {
    let mut out: Vec<Vec<Tuple>> = vec![Vec::new(); num_partitions.max(1)];
    for tuple in tuples {
        let key = tuple.get(key_ordinal).ok_or_else(|| {
            ExecError::Workflow(format!("key ordinal {key_ordinal} out of bounds"))
        })?;
        let idx = partition_index(key, out.len());
        out[idx].push(tuple);
    }
    Ok(out)
}

fn drain(op: &mut dyn Operator, out: &mut Vec<Tuple>) -> ExecResult<()> {
    while op.has_next()? {
        out.push(op.next()?);
    }
    Ok(())
}
