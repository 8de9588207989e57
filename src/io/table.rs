//! CSV table ingest with an explicit schema.
//!
//! An analysis table is an ordered list of rows over a fixed set of named,
//! typed columns. The schema comes from the header line:
//!
//! - `name` or `name:f64` → floating point column
//! - `name:i64`           → integer column (stored as `f64`)
//! - `name:bool`          → boolean column (`true/false/1/0`, stored as `1.0/0.0`)
//!
//! Design goals:
//! - **Strict schema**: duplicate/empty names and unknown types are errors
//! - **Row-level validation**: bad rows are skipped and reported
//! - **Explicit lookups**: unknown columns fail loudly instead of defaulting

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    F64,
    I64,
    Bool,
}

impl ColumnKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "f64" | "f32" | "float" | "double" => Some(ColumnKind::F64),
            "i64" | "i32" | "int" | "long" => Some(ColumnKind::I64),
            "bool" => Some(ColumnKind::Bool),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::F64 => "f64",
            ColumnKind::I64 => "i64",
            ColumnKind::Bool => "bool",
        }
    }

    fn parse_cell(self, s: &str) -> Option<f64> {
        match self {
            ColumnKind::F64 => s.parse::<f64>().ok(),
            ColumnKind::I64 => s.parse::<i64>().ok().map(|v| v as f64),
            ColumnKind::Bool => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(1.0),
                "false" | "0" => Some(0.0),
                _ => None,
            },
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered list of columns with name lookup.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self, AppError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if col.name.is_empty() {
                return Err(AppError::config(format!("Column {} has an empty name.", i + 1)));
            }
            if index.insert(col.name.clone(), i).is_some() {
                return Err(AppError::config(format!("Duplicate column name: `{}`", col.name)));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name`, or an "unknown column" error.
    pub fn position(&self, name: &str) -> Result<usize, AppError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| AppError::config(format!("Unknown column: `{name}`")))
    }
}

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Column-major, read-only table.
#[derive(Debug, Clone)]
pub struct Table {
    schema: Schema,
    columns: Vec<Vec<f64>>,
    row_errors: Vec<RowError>,
}

impl Table {
    /// Build a table from already-validated columns (all the same length).
    pub fn from_columns(schema: Schema, columns: Vec<Vec<f64>>) -> Result<Self, AppError> {
        if columns.len() != schema.len() {
            return Err(AppError::internal(format!(
                "Schema has {} columns but {} were supplied.",
                schema.len(),
                columns.len()
            )));
        }
        let n = columns.first().map(Vec::len).unwrap_or(0);
        if columns.iter().any(|c| c.len() != n) {
            return Err(AppError::internal("Columns have different lengths."));
        }
        Ok(Self {
            schema,
            columns,
            row_errors: Vec::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Result<&[f64], AppError> {
        let idx = self.schema.position(name)?;
        Ok(&self.columns[idx])
    }

    /// Values of a column by position (see `Schema::position`).
    pub fn column_at(&self, idx: usize) -> &[f64] {
        &self.columns[idx]
    }
}

/// Open and parse a CSV table.
pub fn load_table(path: &Path) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open table '{}': {e}", path.display())))?;
    read_table(file)
        .map_err(|e| AppError::new(e.exit_code(), format!("{} ({})", e.message(), path.display())))
}

/// Parse a CSV table from any reader.
pub fn read_table<R: Read>(reader: R) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read table header: {e}")))?
        .clone();
    let schema = parse_schema(&headers)?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); schema.len()];
    let mut row_errors = Vec::new();
    let mut values = vec![0.0; schema.len()];

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_record(&record, &schema, &mut values) {
            Ok(()) => {
                for (col, &v) in columns.iter_mut().zip(values.iter()) {
                    col.push(v);
                }
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        log::warn!("Skipped {} malformed row(s) while reading table.", row_errors.len());
        for err in row_errors.iter().take(5) {
            log::debug!("  line {}: {}", err.line, err.message);
        }
    }

    Ok(Table {
        schema,
        columns,
        row_errors,
    })
}

/// Write a table as CSV with a typed header.
pub fn write_table(path: &Path, table: &Table) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::internal(format!("Failed to create table '{}': {e}", path.display()))
    })?;

    let header: Vec<String> = table
        .schema()
        .columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.kind.label()))
        .collect();
    writer
        .write_record(&header)
        .map_err(|e| AppError::internal(format!("Failed to write table header: {e}")))?;

    let kinds: Vec<ColumnKind> = table.schema().columns().iter().map(|c| c.kind).collect();
    let mut record: Vec<String> = Vec::with_capacity(kinds.len());
    for row in 0..table.n_rows() {
        record.clear();
        for (idx, kind) in kinds.iter().enumerate() {
            let v = table.column_at(idx)[row];
            record.push(match kind {
                ColumnKind::F64 => format!("{v}"),
                ColumnKind::I64 => format!("{}", v as i64),
                ColumnKind::Bool => (if v != 0.0 { "true" } else { "false" }).to_string(),
            });
        }
        writer
            .write_record(&record)
            .map_err(|e| AppError::internal(format!("Failed to write table row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| {
            AppError::internal(format!("Failed to flush table '{}': {e}", path.display()))
        })?;
    Ok(())
}

fn parse_schema(headers: &StringRecord) -> Result<Schema, AppError> {
    let mut columns = Vec::with_capacity(headers.len());
    for raw in headers.iter() {
        // Spreadsheet exports sometimes prefix the first header with a BOM.
        let raw = raw.trim().trim_start_matches('\u{feff}');
        let (name, kind) = match raw.split_once(':') {
            Some((name, tag)) => {
                let kind = ColumnKind::parse(tag).ok_or_else(|| {
                    AppError::config(format!("Unknown column type '{tag}' in header `{raw}`."))
                })?;
                (name.trim(), kind)
            }
            None => (raw, ColumnKind::F64),
        };
        columns.push(Column {
            name: name.to_string(),
            kind,
        });
    }
    if columns.is_empty() {
        return Err(AppError::config("Table header is empty."));
    }
    Schema::new(columns)
}

fn parse_record(record: &StringRecord, schema: &Schema, out: &mut [f64]) -> Result<(), String> {
    if record.len() != schema.len() {
        return Err(format!(
            "Expected {} fields, found {}.",
            schema.len(),
            record.len()
        ));
    }
    for (i, (cell, col)) in record.iter().zip(schema.columns()).enumerate() {
        out[i] = col.kind.parse_cell(cell).ok_or_else(|| {
            format!("Invalid {} value '{cell}' in column `{}`.", col.kind.label(), col.name)
        })?;
    }
    Ok(())
}
