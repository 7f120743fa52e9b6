// SPDX-License-Identifier: Apache-2.0

//! Parquet-backed event files.
//!
//! One file holds one tree. Branches are top-level columns: a signed or
//! `UINT_64` INT64 clock, numeric energies and a repeated integer column of
//! samples. A `tree` key-value entry, when present, names the tree.

use parquet::data_type::{DoubleType, Int64Type};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::format::KeyValue;
use parquet::record::Field;
use parquet::schema::parser::parse_message_type;
use parquet::schema::types::Type;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use wavescope_core::config::BranchNames;

use crate::{EventSource, EventTree, StoreError};

pub const TREE_METADATA_KEY: &str = "tree";

#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetEventSource;

impl EventSource for ParquetEventSource {
    fn backend_tag(&self) -> &'static str {
        "parquet"
    }

    fn open_tree(&self, path: &Path, tree: &str) -> Result<Option<Box<dyn EventTree>>, StoreError> {
        let file = File::open(path)
            .map_err(|e| StoreError(format!("open {}: {e}", path.display())))?;
        let reader = SerializedFileReader::new(file)
            .map_err(|e| StoreError(format!("read {}: {e}", path.display())))?;
        let declared = reader
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kv| kv.iter().find(|entry| entry.key == TREE_METADATA_KEY))
            .and_then(|entry| entry.value.clone());
        if declared.is_some_and(|name| name != tree) {
            return Ok(None);
        }
        Ok(Some(Box::new(ParquetTree { reader })))
    }
}

struct ParquetTree {
    reader: SerializedFileReader<File>,
}

impl ParquetTree {
    /// All values of one top-level column, one per row.
    fn column(&self, branch: &str) -> Result<Vec<Field>, StoreError> {
        let schema = self.reader.metadata().file_metadata().schema();
        let field = schema
            .get_fields()
            .iter()
            .find(|f| f.name() == branch)
            .cloned()
            .ok_or_else(|| StoreError(format!("missing branch: {branch}")))?;
        let projection = Type::group_type_builder(schema.name())
            .with_fields(vec![field])
            .build()
            .map_err(parquet_err)?;
        let rows = self
            .reader
            .get_row_iter(Some(projection))
            .map_err(parquet_err)?;
        let mut out = Vec::with_capacity(usize::try_from(self.num_entries()).unwrap_or(0));
        for row in rows {
            let row = row.map_err(parquet_err)?;
            let value = row
                .into_columns()
                .into_iter()
                .next()
                .map_or(Field::Null, |(_, v)| v);
            out.push(value);
        }
        Ok(out)
    }
}

impl EventTree for ParquetTree {
    fn num_entries(&self) -> u64 {
        u64::try_from(self.reader.metadata().file_metadata().num_rows()).unwrap_or(0)
    }

    fn has_branch(&self, branch: &str) -> bool {
        self.reader
            .metadata()
            .file_metadata()
            .schema()
            .get_fields()
            .iter()
            .any(|f| f.name() == branch)
    }

    fn read_clock(&self, branch: &str) -> Result<Vec<i128>, StoreError> {
        self.column(branch)?.iter().map(field_clock).collect()
    }

    fn read_f64(&self, branch: &str) -> Result<Vec<f64>, StoreError> {
        self.column(branch)?.iter().map(field_f64).collect()
    }

    fn read_samples(&self, branch: &str, rows: &[usize]) -> Result<Vec<Vec<i64>>, StoreError> {
        let column = self.column(branch)?;
        rows.iter()
            .map(|&row| {
                let value = column
                    .get(row)
                    .ok_or_else(|| StoreError(format!("entry {row} out of range in {branch}")))?;
                match value {
                    Field::ListInternal(list) => list.elements().iter().map(field_i64).collect(),
                    Field::Null => Ok(Vec::new()),
                    other => Err(StoreError(format!(
                        "branch {branch} holds {other}, expected a sample array"
                    ))),
                }
            })
            .collect()
    }

    fn branches(&self) -> Vec<String> {
        self.reader
            .metadata()
            .file_metadata()
            .schema()
            .get_fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }
}

fn parquet_err(e: ParquetError) -> StoreError {
    StoreError(e.to_string())
}

fn field_clock(field: &Field) -> Result<i128, StoreError> {
    let value = match *field {
        Field::Long(v) => Some(i128::from(v)),
        Field::ULong(v) => Some(i128::from(v)),
        Field::Int(v) => Some(i128::from(v)),
        Field::UInt(v) => Some(i128::from(v)),
        Field::Short(v) => Some(i128::from(v)),
        Field::UShort(v) => Some(i128::from(v)),
        Field::Byte(v) => Some(i128::from(v)),
        Field::UByte(v) => Some(i128::from(v)),
        _ => None,
    };
    value.ok_or_else(|| StoreError(format!("not a clock value: {field}")))
}

fn field_i64(field: &Field) -> Result<i64, StoreError> {
    let value = match *field {
        Field::Long(v) => Some(v),
        Field::ULong(v) => i64::try_from(v).ok(),
        Field::Int(v) => Some(i64::from(v)),
        Field::UInt(v) => Some(i64::from(v)),
        Field::Short(v) => Some(i64::from(v)),
        Field::UShort(v) => Some(i64::from(v)),
        Field::Byte(v) => Some(i64::from(v)),
        Field::UByte(v) => Some(i64::from(v)),
        _ => None,
    };
    value.ok_or_else(|| StoreError(format!("not an integer sample: {field}")))
}

/// Numeric branch value; a null entry reads as NaN.
fn field_f64(field: &Field) -> Result<f64, StoreError> {
    match *field {
        Field::Double(v) => Ok(v),
        Field::Float(v) => Ok(f64::from(v)),
        Field::Long(v) => Ok(v as f64),
        Field::ULong(v) => Ok(v as f64),
        Field::Int(v) => Ok(f64::from(v)),
        Field::UInt(v) => Ok(f64::from(v)),
        Field::Short(v) => Ok(f64::from(v)),
        Field::UShort(v) => Ok(f64::from(v)),
        Field::Byte(v) => Ok(f64::from(v)),
        Field::UByte(v) => Ok(f64::from(v)),
        Field::Null => Ok(f64::NAN),
        _ => Err(StoreError(format!("not a numeric value: {field}"))),
    }
}

/// Columns of one event file, for writing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    /// Written as the `tree` key-value entry when set.
    pub tree: Option<String>,
    /// Written as a signed INT64 column.
    pub clock: Vec<i64>,
    pub energy: Option<Vec<f64>>,
    pub energy_short: Option<Vec<f64>>,
    pub samples: Option<Vec<Vec<i64>>>,
}

enum ColumnData<'a> {
    Clock(&'a [i64]),
    Float(&'a [f64]),
    Repeated(&'a [Vec<i64>]),
}

/// Write `table` as a single-row-group Parquet event file.
pub fn write_event_file(
    path: &Path,
    names: &BranchNames,
    table: &EventTable,
) -> Result<(), StoreError> {
    let mut columns: Vec<(&str, ColumnData<'_>)> =
        vec![(names.timestamp.as_str(), ColumnData::Clock(&table.clock))];
    if let Some(v) = &table.energy {
        columns.push((names.energy.as_str(), ColumnData::Float(v)));
    }
    if let Some(v) = &table.energy_short {
        columns.push((names.energy_short.as_str(), ColumnData::Float(v)));
    }
    if let Some(v) = &table.samples {
        columns.push((names.samples.as_str(), ColumnData::Repeated(v)));
    }

    let mut message = String::from("message event {\n");
    for (name, data) in &columns {
        let len = match data {
            ColumnData::Clock(v) => {
                message.push_str(&format!("  required int64 {name};\n"));
                v.len()
            }
            ColumnData::Float(v) => {
                message.push_str(&format!("  required double {name};\n"));
                v.len()
            }
            ColumnData::Repeated(v) => {
                message.push_str(&format!("  repeated int64 {name};\n"));
                v.len()
            }
        };
        if len != table.clock.len() {
            return Err(StoreError(format!(
                "branch {name} holds {len} entries, clock holds {}",
                table.clock.len()
            )));
        }
    }
    message.push('}');

    let schema = parse_message_type(&message).map_err(parquet_err)?;
    let props = WriterProperties::builder()
        .set_key_value_metadata(
            table
                .tree
                .clone()
                .map(|tree| vec![KeyValue::new(TREE_METADATA_KEY.to_string(), tree)]),
        )
        .build();
    let file = File::create(path)
        .map_err(|e| StoreError(format!("create {}: {e}", path.display())))?;
    let mut writer =
        SerializedFileWriter::new(file, Arc::new(schema), Arc::new(props)).map_err(parquet_err)?;
    let mut group = writer.next_row_group().map_err(parquet_err)?;
    for (_, data) in &columns {
        let Some(mut column) = group.next_column().map_err(parquet_err)? else {
            return Err(StoreError("schema has fewer columns than data".to_string()));
        };
        match data {
            ColumnData::Clock(v) => {
                column
                    .typed::<Int64Type>()
                    .write_batch(v, None, None)
                    .map_err(parquet_err)?;
            }
            ColumnData::Float(v) => {
                column
                    .typed::<DoubleType>()
                    .write_batch(v, None, None)
                    .map_err(parquet_err)?;
            }
            ColumnData::Repeated(rows) => {
                let (values, def, rep) = repetition_levels(rows);
                column
                    .typed::<Int64Type>()
                    .write_batch(&values, Some(&def), Some(&rep))
                    .map_err(parquet_err)?;
            }
        }
        column.close().map_err(parquet_err)?;
    }
    group.close().map_err(parquet_err)?;
    writer.close().map_err(parquet_err)?;
    Ok(())
}

/// Flatten arrays into values plus definition/repetition levels. An empty
/// array is one slot at level 0 with no value.
fn repetition_levels(rows: &[Vec<i64>]) -> (Vec<i64>, Vec<i16>, Vec<i16>) {
    let mut values = Vec::new();
    let mut def = Vec::new();
    let mut rep = Vec::new();
    for row in rows {
        if row.is_empty() {
            def.push(0);
            rep.push(0);
            continue;
        }
        for (j, &v) in row.iter().enumerate() {
            values.push(v);
            def.push(1);
            rep.push(i16::from(j > 0));
        }
    }
    (values, def, rep)
}
