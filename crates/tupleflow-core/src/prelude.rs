//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::id::{LinkId, WorkerId};
pub use crate::schema::{Attribute, AttributeType, Schema};
pub use crate::tuple::{FieldValue, Tuple};
