//! Projection operator: retains attributes by name and can append literal
//! columns (the one-per-row normalization a two-stage count relies on).
//!
//! Output is computed eagerly in `accept` and still exposed only through the
//! pull side.

use std::collections::VecDeque;
use std::sync::Arc;

use tupleflow_core::error::{Error, Result};
use tupleflow_core::schema::{Attribute, Schema};
use tupleflow_core::tuple::{FieldValue, Tuple};

use crate::traits::{Operator, OperatorState};

pub struct ProjectConfig {
    pub input_schema: Arc<Schema>,
    /// Attributes to retain, in output order.
    pub columns: Vec<String>,
    /// Literal columns appended after the retained ones.
    pub literals: Vec<(String, FieldValue)>,
}

pub struct Project {
    config: ProjectConfig,
    ordinals: Vec<usize>,
    output: Option<Arc<Schema>>,
    ready: VecDeque<Tuple>,
    state: OperatorState,
}

impl Project {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            ordinals: Vec::new(),
            output: None,
            ready: VecDeque::new(),
            state: OperatorState::Uninitialized,
        }
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.require(&[OperatorState::Uninitialized], "initialize")?;
        if self.config.columns.is_empty() && self.config.literals.is_empty() {
            return Err(Error::Config("projection retains no columns".into()));
        }

        self.ordinals = Vec::with_capacity(self.config.columns.len());
        let mut attributes = Vec::new();
        for name in &self.config.columns {
            let ordinal = self
                .config
                .input_schema
                .index_of(name)
                .ok_or_else(|| Error::Config(format!("unknown attribute '{name}'")))?;
            self.ordinals.push(ordinal);
            attributes.push(self.config.input_schema.attributes()[ordinal].clone());
        }
        for (name, value) in &self.config.literals {
            let ty = value
                .attribute_type()
                .ok_or_else(|| Error::Config(format!("literal column '{name}' cannot be null")))?;
            attributes.push(Attribute::new(name.clone(), ty));
        }
        self.output = Some(Arc::new(Schema::new(attributes)?));
        self.state = OperatorState::Open;
        Ok(())
    }

    fn accept(&mut self, tuple: Tuple) -> Result<()> {
        self.state.require(&[OperatorState::Open], "accept")?;
        let output = self
            .output
            .clone()
            .ok_or_else(|| Error::Protocol("projection not initialized".into()))?;

        let mut values = Vec::with_capacity(self.ordinals.len() + self.config.literals.len());
        for &ordinal in &self.ordinals {
            values.push(tuple.get(ordinal).cloned().unwrap_or(FieldValue::Null));
        }
        for (_, literal) in &self.config.literals {
            values.push(literal.clone());
        }
        self.ready.push_back(Tuple::new(output, values)?);
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
        self.output
            .clone()
            .ok_or_else(|| Error::Protocol("projection not initialized".into()))
    }
}
