//! Delimited-text sink writer.

use std::fs::File;
use std::io::{self, Write};

use tupleflow_core::error::{Error, Result};
use tupleflow_core::schema::Schema;
use tupleflow_core::tuple::{FieldValue, Tuple};

pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    wrote_header: bool,
}

impl CsvWriter<File> {
    pub fn to_path(path: &str) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            wrote_header: false,
        }
    }

    /// Write one tuple, emitting a header row from its schema first.
    pub fn write_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        if !self.wrote_header {
            self.write_header(tuple.schema())?;
        }
        let record: Vec<String> = tuple.values().iter().map(render_field).collect();
        self.writer.write_record(&record).map_err(csv_to_io)?;
        Ok(())
    }

    pub fn write_header(&mut self, schema: &Schema) -> Result<()> {
        let names: Vec<&str> = schema.attributes().iter().map(|a| a.name()).collect();
        self.writer.write_record(&names).map_err(csv_to_io)?;
        self.wrote_header = true;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn csv_to_io(e: csv::Error) -> Error {
    Error::Io(io::Error::other(e))
}

// Null renders as an empty cell; the scan side reads that back as absent
// only when the field is record-end-terminated.
fn render_field(value: &FieldValue) -> String {
    use FieldValue::*;
    match value {
        Null => String::new(),
        Str(s) => s.clone(),
        Int(v) => v.to_string(),
        Long(v) => v.to_string(),
        Double(v) => v.to_string(),
        Bool(v) => v.to_string(),
        Timestamp(v) => v.to_string(),
        Bytes(b) => format!("[binary {} bytes]", b.len()),
        List(items) => format!("[list {} items]", items.len()),
        Id(v) => v.to_string(),
    }
}
