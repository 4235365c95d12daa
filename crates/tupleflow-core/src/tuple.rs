//! Immutable typed records and their field values.
//!
//! A `Tuple` pairs a shared `Schema` with one value per attribute. Tuples are
//! immutable; transformations always produce a new tuple. `Null` is a valid
//! value for any attribute type and is distinct from an absent field.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
pub use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schema::{AttributeType, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Str(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Bytes(Vec<u8>),
    List(Vec<FieldValue>),
    Id(Uuid),
}

impl FieldValue {
    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self {
            FieldValue::Null => None,
            FieldValue::Str(_) => Some(AttributeType::String),
            FieldValue::Int(_) => Some(AttributeType::Integer),
            FieldValue::Long(_) => Some(AttributeType::Long),
            FieldValue::Double(_) => Some(AttributeType::Double),
            FieldValue::Bool(_) => Some(AttributeType::Boolean),
            FieldValue::Timestamp(_) => Some(AttributeType::Timestamp),
            FieldValue::Bytes(_) => Some(AttributeType::Binary),
            FieldValue::List(_) => Some(AttributeType::List),
            FieldValue::Id(_) => Some(AttributeType::Id),
        }
    }

    /// True when the value is admissible for `ty` (`Null` always is).
    pub fn matches(&self, ty: AttributeType) -> bool {
        match self {
            FieldValue::Null => true,
            other => other.attribute_type() == Some(ty),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(i64::from(*v)),
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(f64::from(*v)),
            FieldValue::Long(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric addition with widening: integer kinds accumulate as `Long`,
    /// any `Double` operand promotes the result to `Double`.
    pub fn add(&self, other: &FieldValue) -> Result<FieldValue> {
        use FieldValue::{Double, Long};
        match (self, other) {
            (Double(_), _) | (_, Double(_)) => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(Double(a + b)),
                _ => Err(Error::TypeMismatch(format!(
                    "cannot add {self:?} and {other:?}"
                ))),
            },
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => Ok(Long(a + b)),
                _ => Err(Error::TypeMismatch(format!(
                    "cannot add {self:?} and {other:?}"
                ))),
            },
        }
    }

    /// Ordering for MIN/MAX and comparison predicates. Numeric kinds compare
    /// after widening; Str/Bool/Timestamp/Bytes compare within their own kind.
    pub fn compare(&self, other: &FieldValue) -> Result<Ordering> {
        use FieldValue::{Bool, Bytes, Str, Timestamp};
        match (self, other) {
            (Str(a), Str(b)) => Ok(a.cmp(b)),
            (Bool(a), Bool(b)) => Ok(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Ok(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Ok(a.cmp(b)),
            _ => {
                if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
                    return Ok(a.cmp(&b));
                }
                match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
                    _ => Err(Error::TypeMismatch(format!(
                        "cannot compare {self:?} and {other:?}"
                    ))),
                }
            }
        }
    }
}

// Join and group-by keys: doubles compare and hash by bit pattern so a
// `FieldValue` can key a HashMap.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Str(a), Str(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Bool(a), Bool(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Id(a), Id(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use FieldValue::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Null => {}
            Str(v) => v.hash(state),
            Int(v) => v.hash(state),
            Long(v) => v.hash(state),
            Double(v) => v.to_bits().hash(state),
            Bool(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            Bytes(v) => v.hash(state),
            List(v) => v.hash(state),
            Id(v) => v.hash(state),
        }
    }
}

/// One record flowing through the dataflow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<FieldValue>,
}

impl Tuple {
    /// Validates arity and per-position type against the schema.
    pub fn new(schema: Arc<Schema>, values: Vec<FieldValue>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(Error::TypeMismatch(format!(
                "expected {} fields, got {}",
                schema.len(),
                values.len()
            )));
        }
        for (attr, value) in schema.attributes().iter().zip(&values) {
            if !value.matches(attr.attribute_type()) {
                return Err(Error::TypeMismatch(format!(
                    "field '{}' expects {:?}, got {value:?}",
                    attr.name(),
                    attr.attribute_type()
                )));
            }
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, ordinal: usize) -> Option<&FieldValue> {
        self.values.get(ordinal)
    }

    /// Case-insensitive field access by attribute name.
    pub fn get_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }
}
