//! Hash join with an implicit build→probe state machine driven by
//! upstream-exhaustion signals.
//!
//! The build side (inner link) must be fully consumed before the first outer
//! `accept`: probing a partial build table yields wrong results, not merely
//! incomplete ones, so the ordering violation is fatal.

use std::collections::HashMap;
use std::sync::Arc;

use tupleflow_core::error::{Error, Result};
use tupleflow_core::id::LinkId;
use tupleflow_core::schema::Schema;
use tupleflow_core::tuple::{FieldValue, Tuple};

use crate::traits::{Operator, OperatorState};

pub struct HashJoinConfig {
    /// Upstream identity of the build side.
    pub inner_link: LinkId,
    pub inner_key: usize,
    pub outer_key: usize,
    pub outer_schema: Arc<Schema>,
    pub inner_schema: Arc<Schema>,
}

/// Pending probe: one outer tuple and its position in the matched bucket.
struct Probe {
    outer: Vec<FieldValue>,
    key: FieldValue,
    pos: usize,
}

pub struct HashJoin {
    config: HashJoinConfig,
    /// Key → inner field arrays, in arrival order.
    build: HashMap<FieldValue, Vec<Vec<FieldValue>>>,
    inner_finished: bool,
    /// Some(true) while the current batch comes from the inner link; None
    /// until the first `on_upstream_changed`.
    current_is_inner: Option<bool>,
    probe: Option<Probe>,
    output: Option<Arc<Schema>>,
    state: OperatorState,
}

impl HashJoin {
    pub fn new(config: HashJoinConfig) -> Self {
        Self {
            config,
            build: HashMap::new(),
            inner_finished: false,
            current_is_inner: None,
            probe: None,
            output: None,
            state: OperatorState::Uninitialized,
        }
    }
}

impl Operator for HashJoin {
    fn name(&self) -> &'static str {
        "join_hash"
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.require(&[OperatorState::Uninitialized], "initialize")?;
        if self.config.inner_key >= self.config.inner_schema.len() {
            return Err(Error::Config(format!(
                "inner key ordinal {} out of bounds",
                self.config.inner_key
            )));
        }
        if self.config.outer_key >= self.config.outer_schema.len() {
            return Err(Error::Config(format!(
                "outer key ordinal {} out of bounds",
                self.config.outer_key
            )));
        }
        self.output = Some(Arc::new(Schema::concat(
            &self.config.outer_schema,
            &self.config.inner_schema,
        )?));
        self.state = OperatorState::Open;
        Ok(())
    }

    fn on_upstream_changed(&mut self, link: LinkId) {
        self.current_is_inner = Some(link == self.config.inner_link);
    }

    fn accept(&mut self, tuple: Tuple) -> Result<()> {
        self.state.require(&[OperatorState::Open], "accept")?;
        let is_inner = self
            .current_is_inner
            .ok_or_else(|| Error::Protocol("accept before any on_upstream_changed".into()))?;

        if is_inner {
            if self.inner_finished {
                return Err(Error::Protocol(
                    "build-side accept after the inner link was exhausted".into(),
                ));
            }
            let key = tuple
                .get(self.config.inner_key)
                .cloned()
                .ok_or_else(|| Error::Protocol("inner key ordinal out of bounds".into()))?;
            self.build.entry(key).or_default().push(tuple.into_values());
        } else {
            // The build must be complete: joining against a partial table
            // produces wrong output, never just less of it.
            if !self.inner_finished {
                return Err(Error::Protocol(
                    "probe tuple received before the build side finished".into(),
                ));
            }
            let key = tuple
                .get(self.config.outer_key)
                .cloned()
                .ok_or_else(|| Error::Protocol("outer key ordinal out of bounds".into()))?;
            // A new outer tuple replaces the probe cursor; an undrained match
            // set is dropped (see DESIGN.md).
            if self.build.contains_key(&key) {
                self.probe = Some(Probe {
                    outer: tuple.into_values(),
                    key,
                    pos: 0,
                });
            } else {
                self.probe = None;
            }
        }
        Ok(())
    }

    fn on_upstream_exhausted(&mut self, link: LinkId) -> Result<()> {
        if link == self.config.inner_link {
            self.inner_finished = true;
        }
        Ok(())
    }

    fn no_more(&mut self) -> Result<()> {
        self.state
            .require(&[OperatorState::Open, OperatorState::Producing], "no_more")?;
        self.state = OperatorState::Producing;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.state
            .require(&[OperatorState::Open, OperatorState::Producing], "has_next")?;
        Ok(self.probe.as_ref().is_some_and(|p| {
            self.build.get(&p.key).is_some_and(|bucket| p.pos < bucket.len())
        }))
    }

    fn next(&mut self) -> Result<Tuple> {
        self.state
            .require(&[OperatorState::Open, OperatorState::Producing], "next")?;
        let output = self
            .output
            .clone()
            .ok_or_else(|| Error::Protocol("join not initialized".into()))?;
        let Some(probe) = self.probe.as_mut() else {
            return Err(Error::Protocol("next called with no pending match".into()));
        };
        let Some(row) = self.build.get(&probe.key).and_then(|b| b.get(probe.pos)) else {
            return Err(Error::Protocol("next called with no pending match".into()));
        };
        probe.pos += 1;
        let mut values = probe.outer.clone();
        values.extend(row.iter().cloned());
        Tuple::new(output, values)
    }

    fn dispose(&mut self) -> Result<()> {
        self.build.clear();
        self.probe = None;
        self.state = OperatorState::Closed;
        Ok(())
    }

    fn output_schema(&self) -> Result<Arc<Schema>> {
        self.output
            .clone()
            .ok_or_else(|| Error::Protocol("join not initialized".into()))
    }
}
