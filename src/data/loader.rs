use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Dataset, Row};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header line + comma-separated rows (no quoting)
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.parquet` – flat table; every column type arrow can display is read as text
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path).context("reading CSV file")?;
    Ok(parse_csv(&bytes)?)
}

/// Parse delimited text.
///
/// The first line names the columns. Every following line is split on `,` and
/// matched to the header by position: missing trailing fields become `Null`,
/// surplus fields are dropped. Quotes are ordinary characters. Headers and
/// fields are trimmed; blank lines are skipped.
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::malformed(format!("reading CSV header: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(DataError::malformed("file has no header line"));
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::malformed(format!("CSV row {row_no}: {e}")))?;

        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = match record.get(idx) {
                    Some(field) => CellValue::text(field),
                    None => CellValue::Null,
                };
                (col.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Dataset::new(headers, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    Ok(parse_json(&text)?)
}

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "sepal_length": 5.1, "species": "setosa" },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen key order; keys missing from a record are `Null`.
pub fn parse_json(text: &str) -> Result<Dataset, DataError> {
    let root: JsonValue = serde_json::from_str(text)
        .map_err(|e| DataError::malformed(format!("parsing JSON: {e}")))?;
    let records = root
        .as_array()
        .ok_or_else(|| DataError::malformed("expected a top-level JSON array"))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataError::malformed(format!("row {i} is not a JSON object")))?;

        let mut row = Row::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Dataset::new(columns, rows)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Null => CellValue::Null,
        JsonValue::String(s) => CellValue::text(s.as_str()),
        JsonValue::Number(n) => CellValue::text(n.to_string()),
        JsonValue::Bool(b) => CellValue::text(b.to_string()),
        other => CellValue::text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Every cell is converted to text; types
/// without a fast path (small ints, dates, decimals, dictionaries, ...) go
/// through arrow's display formatting.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let options = FormatOptions::default();
    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let formatters = batch
            .columns()
            .iter()
            .zip(&columns)
            .map(|(col, name)| {
                ArrayFormatter::try_new(col.as_ref(), &options)
                    .with_context(|| format!("column \"{name}\" has an unsupported type"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row_idx in 0..batch.num_rows() {
            let row: Row = columns
                .iter()
                .zip(batch.columns())
                .zip(&formatters)
                .map(|((name, col), fmt)| (name.clone(), arrow_cell(col, fmt, row_idx)))
                .collect();
            rows.push(row);
        }
    }

    Ok(Dataset::new(columns, rows)?)
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, fmt: &ArrayFormatter<'_>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => CellValue::text(col.as_string::<i64>().value(row)),
        DataType::Int32 => CellValue::text(col.as_primitive::<Int32Type>().value(row).to_string()),
        DataType::Int64 => CellValue::text(col.as_primitive::<Int64Type>().value(row).to_string()),
        DataType::Float32 => {
            CellValue::text(col.as_primitive::<Float32Type>().value(row).to_string())
        }
        DataType::Float64 => {
            CellValue::text(col.as_primitive::<Float64Type>().value(row).to_string())
        }
        DataType::Boolean => CellValue::text(col.as_boolean().value(row).to_string()),
        _ => CellValue::text(fmt.value(row).to_string()),
    }
}
