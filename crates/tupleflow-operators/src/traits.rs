//! Operator trait + the lifecycle state machine.
//!
//! Tuples are pushed in through `accept` and pulled out through
//! `has_next`/`next`; upstream-exhaustion signals drive phase transitions
//! (the hash join's build→probe flip lives entirely on those signals).

use std::sync::Arc;

use tupleflow_core::error::{Error, Result};
use tupleflow_core::id::LinkId;
use tupleflow_core::schema::Schema;
use tupleflow_core::tuple::Tuple;

/// Lifecycle states. `Producing` is entered by `no_more()`; the pull side is
/// already usable while `Open` because joins drain per outer tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    Uninitialized,
    Open,
    Producing,
    Closed,
}

impl OperatorState {
    /// Runtime guard: `call` must only run in one of `allowed`.
    pub fn require(self, allowed: &[OperatorState], call: &str) -> Result<()> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(Error::Protocol(format!("{call} called in state {self:?}")))
        }
    }
}

/// Trait that all operators implement.
///
/// Invariants:
/// - All calls for one instance happen sequentially from one logical worker
///   thread; no internal locking.
/// - `accept` must never run after `no_more()`.
/// - Operators never mutate a tuple they did not construct themselves.
pub trait Operator {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Allocate internal state and validate configuration. Moves to `Open`.
    fn initialize(&mut self) -> Result<()>;

    /// Subsequent `accept` calls originate from `link`. Pure bookkeeping;
    /// only multi-input operators care.
    fn on_upstream_changed(&mut self, _link: LinkId) {}

    /// Push one input record. Only valid while `Open`.
    fn accept(&mut self, tuple: Tuple) -> Result<()>;

    /// `link` will deliver no more tuples.
    fn on_upstream_exhausted(&mut self, _link: LinkId) -> Result<()> {
        Ok(())
    }

    /// No upstream delivers anything further; finalize buffered state into an
    /// iterable result set. Idempotent. Moves to `Producing`.
    fn no_more(&mut self) -> Result<()>;

    /// Pull side. Valid while `Open` or `Producing`.
    fn has_next(&mut self) -> Result<bool>;

    /// Next produced tuple; `Error::Protocol` when `has_next()` is false.
    fn next(&mut self) -> Result<Tuple>;

    /// Release internal state. Valid from any state. Moves to `Closed`.
    fn dispose(&mut self) -> Result<()>;

    /// Output schema, composed at `initialize()` from the configured
    /// upstream schema(s).
    fn output_schema(&self) -> Result<Arc<Schema>>;
}
