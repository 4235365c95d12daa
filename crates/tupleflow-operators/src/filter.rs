//! Filter operator: comparison predicate against a literal value.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tupleflow_core::error::{Error, Result};
use tupleflow_core::schema::Schema;
use tupleflow_core::tuple::{FieldValue, Tuple};

use crate::traits::{Operator, OperatorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

pub struct FilterConfig {
    pub input_schema: Arc<Schema>,
    /// Attribute the predicate tests. Required.
    pub attribute: Option<String>,
    pub op: CmpOp,
    pub literal: FieldValue,
}

pub struct Filter {
    config: FilterConfig,
    ordinal: usize,
    ready: VecDeque<Tuple>,
    state: OperatorState,
}

impl Filter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            ordinal: 0,
            ready: VecDeque::new(),
            state: OperatorState::Uninitialized,
        }
    }

    // Null comparisons are false, matching the usual tri-state convention.
    fn matches(&self, value: &FieldValue) -> bool {
        if value.is_null() {
            return false;
        }
        let Ok(ord) = value.compare(&self.config.literal) else {
            return false;
        };
        match self.config.op {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

impl Operator for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.require(&[OperatorState::Uninitialized], "initialize")?;
        let name = self
            .config
            .attribute
            .as_deref()
            .ok_or_else(|| Error::Config("filter requires an attribute name".into()))?;
        self.ordinal = self
            .config
            .input_schema
            .index_of(name)
            .ok_or_else(|| Error::Config(format!("unknown attribute '{name}'")))?;
        self.state = OperatorState::Open;
        Ok(())
    }

    fn accept(&mut self, tuple: Tuple) -> Result<()> {
        self.state.require(&[OperatorState::Open], "accept")?;
        let keep = tuple.get(self.ordinal).is_some_and(|v| self.matches(v));
        if keep {
            self.ready.push_back(tuple);
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
        Ok(!self.ready.is_empty())
    }

    fn next(&mut self) -> Result<Tuple> {
        self.state
            .require(&[OperatorState::Open, OperatorState::Producing], "next")?;
        self.ready
            .pop_front()
            .ok_or_else(|| Error::Protocol("next called with no pending tuple".into()))
    }

    fn dispose(&mut self) -> Result<()> {
        self.ready.clear();
        self.state = OperatorState::Closed;
        Ok(())
    }

    fn output_schema(&self) -> Result<Arc<Schema>> {
        Ok(Arc::clone(&self.config.input_schema))
    }
}
