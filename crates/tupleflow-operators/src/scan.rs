//! Scan operator: drives a `BlockReader` over one byte range and parses each
//! delimited record into a typed tuple.

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

use tupleflow_core::error::{Error, Result};
use tupleflow_core::schema::{AttributeType, Schema};
use tupleflow_core::tuple::{FieldValue, Tuple, Uuid};
use tupleflow_io::block::BlockReader;
use tupleflow_io::source::ByteSource;

use crate::traits::{Operator, OperatorState};

pub struct ScanConfig {
    /// Schema of the materialized columns, in file order.
    pub schema: Arc<Schema>,
    pub delimiter: u8,
    /// Byte range `[start, end)` assigned to this instance.
    pub start: u64,
    pub end: u64,
    /// Column ordinals to materialize; the file may carry more columns than
    /// the schema when projection drops some.
    pub keep: Option<HashSet<usize>>,
    pub chunk_bytes: usize,
}

pub struct Scan {
    config: ScanConfig,
    source: Arc<dyn ByteSource>,
    reader: Option<BlockReader<Box<dyn Read + Send>>>,
    lookahead: Option<Tuple>,
    state: OperatorState,
}

impl Scan {
    pub fn new(source: Arc<dyn ByteSource>, config: ScanConfig) -> Self {
        Self {
            config,
            source,
            reader: None,
            lookahead: None,
            state: OperatorState::Uninitialized,
        }
    }

    fn refill_lookahead(&mut self) -> Result<()> {
        if self.lookahead.is_some() {
            return Ok(());
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        if reader.has_more()? {
            if let Some(fields) = reader.read_record()? {
                self.lookahead = Some(parse_record(&self.config.schema, fields)?);
            }
        }
        Ok(())
    }
}

impl Operator for Scan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.require(&[OperatorState::Uninitialized], "initialize")?;
        if self.config.schema.is_empty() {
            return Err(Error::Config("scan requires a non-empty schema".into()));
        }
        if self.config.end < self.config.start {
            return Err(Error::Config(format!(
                "invalid byte range {}..{}",
                self.config.start, self.config.end
            )));
        }
        let input = self.source.open_at(self.config.start)?;
        self.reader = Some(BlockReader::with_chunk_size(
            input,
            self.config.start,
            self.config.end - self.config.start,
            self.config.delimiter,
            self.config.keep.clone(),
            self.config.chunk_bytes,
        ));
        self.state = OperatorState::Open;
        Ok(())
    }

    fn accept(&mut self, _tuple: Tuple) -> Result<()> {
        Err(Error::Protocol("scan is a source and accepts no input".into()))
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
        self.refill_lookahead()?;
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        self.state
            .require(&[OperatorState::Open, OperatorState::Producing], "next")?;
        self.refill_lookahead()?;
        self.lookahead
            .take()
            .ok_or_else(|| Error::Protocol("next called with no pending record".into()))
    }

    fn dispose(&mut self) -> Result<()> {
        self.reader = None;
        self.lookahead = None;
        self.state = OperatorState::Closed;
        Ok(())
    }

    fn output_schema(&self) -> Result<Arc<Schema>> {
        Ok(Arc::clone(&self.config.schema))
    }
}

/// Parse one delimited record into a typed tuple. Missing trailing fields
/// become `Null`; surplus fields are ignored.
fn parse_record(schema: &Arc<Schema>, fields: Vec<Option<String>>) -> Result<Tuple> {
    let mut values = Vec::with_capacity(schema.len());
    for (i, attr) in schema.attributes().iter().enumerate() {
        let raw = fields.get(i).cloned().flatten();
        values.push(parse_field(raw, attr.attribute_type(), attr.name())?);
    }
    Tuple::new(Arc::clone(schema), values)
}

fn parse_field(raw: Option<String>, ty: AttributeType, name: &str) -> Result<FieldValue> {
    let Some(text) = raw else {
        return Ok(FieldValue::Null);
    };
    // Empty cells in non-string columns carry no value.
    if text.is_empty() && ty != AttributeType::String {
        return Ok(FieldValue::Null);
    }
    match ty {
        AttributeType::String => Ok(FieldValue::Str(text)),
        AttributeType::Integer => text
            .trim()
            .parse::<i32>()
            .map(FieldValue::Int)
            .map_err(|e| Error::TypeMismatch(format!("field '{name}': {e}: '{text}'"))),
        AttributeType::Long => text
            .trim()
            .parse::<i64>()
            .map(FieldValue::Long)
            .map_err(|e| Error::TypeMismatch(format!("field '{name}': {e}: '{text}'"))),
        AttributeType::Timestamp => text
            .trim()
            .parse::<i64>()
            .map(FieldValue::Timestamp)
            .map_err(|e| Error::TypeMismatch(format!("field '{name}': {e}: '{text}'"))),
        AttributeType::Double => text
            .trim()
            .parse::<f64>()
            .map(FieldValue::Double)
            .map_err(|e| Error::TypeMismatch(format!("field '{name}': {e}: '{text}'"))),
        AttributeType::Boolean => text
            .trim()
            .parse::<bool>()
            .map(FieldValue::Bool)
            .map_err(|e| Error::TypeMismatch(format!("field '{name}': {e}: '{text}'"))),
        AttributeType::Id => Uuid::parse_str(text.trim())
            .map(FieldValue::Id)
            .map_err(|e| Error::TypeMismatch(format!("field '{name}': {e}: '{text}'"))),
        AttributeType::Binary => Ok(FieldValue::Bytes(text.into_bytes())),
        AttributeType::List => Err(Error::TypeMismatch(format!(
            "field '{name}': list fields cannot be scanned from delimited text"
        ))),
    }
}
