//! Incremental group-by/aggregation.
//!
//! Running aggregates merge per key on every `accept`. Average keeps
//! (sum, count) and divides at emission time; the mean itself is never
//! stored. Emission order is the accumulator map's iteration order, which
//! callers must not rely on.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tupleflow_core::error::{Error, Result};
use tupleflow_core::schema::{Attribute, AttributeType, Schema};
use tupleflow_core::tuple::{FieldValue, Tuple};

use crate::traits::{Operator, OperatorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    Min,
    Max,
    Sum,
    /// Identical accumulation to `Sum`; callers normalize the value column
    /// to one-per-row upstream.
    Count,
    Average,
}

pub struct GroupByConfig {
    pub input_schema: Arc<Schema>,
    /// Grouping key ordinal.
    pub key: usize,
    /// Value column ordinal.
    pub value: usize,
    pub kind: AggregateKind,
}

pub struct GroupBy {
    config: GroupByConfig,
    results: HashMap<FieldValue, FieldValue>,
    /// Contributions per key; only consulted when emitting Average.
    counts: HashMap<FieldValue, u64>,
    ready: VecDeque<Tuple>,
    finalized: bool,
    output: Option<Arc<Schema>>,
    state: OperatorState,
}

impl GroupBy {
    pub fn new(config: GroupByConfig) -> Self {
        Self {
            config,
            results: HashMap::new(),
            counts: HashMap::new(),
            ready: VecDeque::new(),
            finalized: false,
            output: None,
            state: OperatorState::Uninitialized,
        }
    }
}

impl Operator for GroupBy {
    fn name(&self) -> &'static str {
        "group_by"
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.require(&[OperatorState::Uninitialized], "initialize")?;
        let key_attr = self
            .config
            .input_schema
            .attribute(self.config.key)
            .ok_or_else(|| {
                Error::Config(format!("key ordinal {} out of bounds", self.config.key))
            })?
            .clone();
        let value_attr = self
            .config
            .input_schema
            .attribute(self.config.value)
            .ok_or_else(|| {
                Error::Config(format!("value ordinal {} out of bounds", self.config.value))
            })?;

        let result_type = match self.config.kind {
            AggregateKind::Average => AttributeType::Double,
            AggregateKind::Sum | AggregateKind::Count => match value_attr.attribute_type() {
                AttributeType::Double => AttributeType::Double,
                _ => AttributeType::Long,
            },
            AggregateKind::Min | AggregateKind::Max => value_attr.attribute_type(),
        };
        let result_attr = Attribute::new(value_attr.name(), result_type);
        self.output = Some(Arc::new(Schema::new(vec![key_attr, result_attr])?));
        self.state = OperatorState::Open;
        Ok(())
    }

    fn accept(&mut self, tuple: Tuple) -> Result<()> {
        self.state.require(&[OperatorState::Open], "accept")?;
        let key = tuple
            .get(self.config.key)
            .cloned()
            .ok_or_else(|| Error::Protocol("key ordinal out of bounds".into()))?;
        let value = tuple
            .get(self.config.value)
            .cloned()
            .ok_or_else(|| Error::Protocol("value ordinal out of bounds".into()))?;

        if let Some(current) = self.results.get_mut(&key) {
            let combined = match self.config.kind {
                AggregateKind::Min => {
                    if value.compare(current)? == Ordering::Less {
                        value
                    } else {
                        current.clone()
                    }
                }
                AggregateKind::Max => {
                    if value.compare(current)? == Ordering::Greater {
                        value
                    } else {
                        current.clone()
                    }
                }
                AggregateKind::Sum | AggregateKind::Count => current.add(&value)?,
                AggregateKind::Average => {
                    if let Some(count) = self.counts.get_mut(&key) {
                        *count += 1;
                    }
                    current.add(&value)?
                }
            };
            *current = combined;
        } else {
            self.results.insert(key.clone(), value);
            self.counts.insert(key, 1);
        }
        Ok(())
    }

    fn no_more(&mut self) -> Result<()> {
        self.state
            .require(&[OperatorState::Open, OperatorState::Producing], "no_more")?;
        if !self.finalized {
            self.finalized = true;
            let output = self
                .output
                .clone()
                .ok_or_else(|| Error::Protocol("group-by not initialized".into()))?;
            let kind = self.config.kind;
            for (key, agg) in self.results.drain() {
                let value = match kind {
                    AggregateKind::Average => {
                        let count = self.counts.get(&key).copied().unwrap_or(1);
                        let sum = agg.as_f64().ok_or_else(|| {
                            Error::TypeMismatch(format!("non-numeric average sum {agg:?}"))
                        })?;
                        FieldValue::Double(sum / count as f64)
                    }
                    AggregateKind::Sum | AggregateKind::Count => widen_integral(agg),
                    AggregateKind::Min | AggregateKind::Max => agg,
                };
                self.ready
                    .push_back(Tuple::new(Arc::clone(&output), vec![key, value])?);
            }
        }
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
            .ok_or_else(|| Error::Protocol("next called with no pending group".into()))
    }

    fn dispose(&mut self) -> Result<()> {
        self.results.clear();
        self.counts.clear();
        self.ready.clear();
        self.state = OperatorState::Closed;
        Ok(())
    }

    fn output_schema(&self) -> Result<Arc<Schema>> {
        self.output
            .clone()
            .ok_or_else(|| Error::Protocol("group-by not initialized".into()))
    }
}

// A single-contribution Sum/Count key still holds the raw accepted value;
// align it with the declared Long result type.
fn widen_integral(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Int(v) => FieldValue::Long(i64::from(v)),
        other => other,
    }
}
