//! Logical schema types: attributes and ordered attribute sequences.
//!
//! Attribute names compare case-insensitively everywhere; ordinal positions
//! are stable for the lifetime of a schema.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Timestamp,
    Binary,
    List,
    Id,
}

/// One named, typed column. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    attribute_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }
}

// Name comparisons are case-insensitive, so equality and hashing must agree
// on the folded form.
impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.attribute_type == other.attribute_type && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.attribute_type.hash(state);
    }
}

/// An ordered attribute sequence with unique (case-insensitive) names.
///
/// Two schemas are equal iff their attribute sequences are equal, order
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    /// Build a schema, rejecting duplicate attribute names.
    pub fn new(attributes: Vec<Attribute>) -> Result<Self> {
        for (i, a) in attributes.iter().enumerate() {
            if attributes[..i]
                .iter()
                .any(|b| b.name.eq_ignore_ascii_case(&a.name))
            {
                return Err(Error::Schema(format!(
                    "duplicate attribute name '{}'",
                    a.name
                )));
            }
        }
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attribute(&self, ordinal: usize) -> Option<&Attribute> {
        self.attributes.get(ordinal)
    }

    /// Case-insensitive name → ordinal lookup.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Left ++ right composition used by joins. Conflicting right-side names
    /// get a disambiguating suffix.
    pub fn concat(left: &Schema, right: &Schema) -> Result<Schema> {
        let mut attributes = left.attributes.clone();
        for a in &right.attributes {
            let name = if left.index_of(a.name()).is_some() {
                format!("{}_right", a.name())
            } else {
                a.name().to_string()
            };
            attributes.push(Attribute::new(name, a.attribute_type()));
        }
        Schema::new(attributes)
    }

    /// Retain the attributes at `ordinals`, in the given order.
    pub fn project(&self, ordinals: &[usize]) -> Result<Schema> {
        let mut attributes = Vec::with_capacity(ordinals.len());
        for &i in ordinals {
            let a = self
                .attribute(i)
                .ok_or_else(|| Error::Schema(format!("ordinal {i} out of bounds")))?;
            attributes.push(a.clone());
        }
        Schema::new(attributes)
    }
}
