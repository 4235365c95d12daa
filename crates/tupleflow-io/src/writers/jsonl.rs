//! Streaming NDJSON writer.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use tupleflow_core::error::Result;
use tupleflow_core::tuple::{FieldValue, Tuple};

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
}

impl JsonlWriter<File> {
    pub fn to_path(path: &str) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Write one tuple as a single JSON object line keyed by attribute name.
    pub fn write_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let mut obj = BTreeMap::new();
        for (attr, value) in tuple.schema().attributes().iter().zip(tuple.values()) {
            obj.insert(attr.name().to_string(), field_to_json(value));
        }
        let line = serde_json::to_string(&obj).map_err(|e| {
            tupleflow_core::error::Error::Io(std::io::Error::other(e))
        })?;
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn field_to_json(value: &FieldValue) -> serde_json::Value {
    use FieldValue::*;
    match value {
        Null => serde_json::Value::Null,
        Str(s) => serde_json::Value::String(s.clone()),
        Int(v) => serde_json::Value::from(*v),
        Long(v) => serde_json::Value::from(*v),
        Double(v) => serde_json::Value::from(*v),
        Bool(v) => serde_json::Value::Bool(*v),
        Timestamp(v) => serde_json::Value::from(*v),
        Bytes(b) => serde_json::Value::String(format!("[binary {} bytes]", b.len())),
        List(items) => serde_json::Value::Array(items.iter().map(field_to_json).collect()),
        Id(v) => serde_json::Value::String(v.to_string()),
    }
}
