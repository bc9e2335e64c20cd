use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow::temporal_conversions::{
    date32_to_datetime, date64_to_datetime, timestamp_ms_to_datetime, timestamp_ns_to_datetime,
    timestamp_s_to_datetime, timestamp_us_to_datetime,
};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{years_between, DeviceDataset, DeviceRecord, DURATION_TOLERANCE};

// ---------------------------------------------------------------------------
// Column names of the lifecycle table
// ---------------------------------------------------------------------------

pub const COL_NAME: &str = "Device Name";
pub const COL_BRAND: &str = "Brand";
pub const COL_CATEGORY: &str = "Device Category";
pub const COL_START: &str = "Start Date";
pub const COL_END: &str = "End Date";
pub const COL_DURATION: &str = "Duration";
pub const COL_REASON: &str = "Reason for Discontinuing";

/// Columns every input must provide. `Duration` is derived when absent.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_NAME,
    COL_BRAND,
    COL_CATEGORY,
    COL_START,
    COL_END,
    COL_REASON,
];

/// Header names spreadsheet exports give a positional row index.
const INDEX_HEADERS: [&str; 3] = ["unnamed: 0", "index", "#"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: cannot parse {column} '{value}' as a date")]
    InvalidDate {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
    #[error("data file contains no devices")]
    Empty,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

// ---------------------------------------------------------------------------
// Cached data source
// ---------------------------------------------------------------------------

/// A lifecycle file that is read at most once per process.
///
/// The first successful [`DataSource::load`] parses the file; every later call
/// hands out the same `Arc` without touching the filesystem. Failures are not
/// cached, so a missing file can be supplied and retried.
#[derive(Debug)]
pub struct DataSource {
    path: PathBuf,
    cached: OnceLock<Arc<DeviceDataset>>,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Arc<DeviceDataset>, LoadError> {
        if let Some(dataset) = self.cached.get() {
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(load_file(&self.path)?);
        log::info!(
            "Loaded {} devices ({} brands, {} categories) from {}",
            dataset.len(),
            dataset.brands.len(),
            dataset.categories.len(),
            self.path.display()
        );
        Ok(Arc::clone(self.cached.get_or_init(|| dataset)))
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a device lifecycle table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx`    – the lifecycle workbook, first sheet (recommended)
/// * `.xls`     – legacy Excel workbook
/// * `.csv`     – spreadsheet export, one device per row
/// * `.json`    – `[{ "Device Name": ..., "Brand": ..., ... }, ...]`
/// * `.parquet` – flat table with the same column names
pub fn load_file(path: &Path) -> Result<DeviceDataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::SourceNotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "xlsx" | "xls" => read_excel(path)?,
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.into_record(i + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let dataset = DeviceDataset::from_records(records);
    if dataset.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Raw rows: text cells before type normalisation
// ---------------------------------------------------------------------------

/// One row as read from any source format, cells still textual.
#[derive(Debug, Clone, Deserialize)]
struct RawRow {
    #[serde(rename = "Device Name")]
    name: String,
    #[serde(rename = "Brand")]
    brand: String,
    #[serde(rename = "Device Category")]
    category: String,
    #[serde(rename = "Start Date")]
    start: String,
    #[serde(rename = "End Date")]
    end: String,
    #[serde(rename = "Duration", default)]
    duration: Option<String>,
    #[serde(rename = "Reason for Discontinuing")]
    reason: String,
}

impl RawRow {
    /// Parse dates, check ordering and settle the duration. `row` is 1-based.
    fn into_record(self, row: usize) -> Result<DeviceRecord, LoadError> {
        let start = parse_date(&self.start).ok_or_else(|| LoadError::InvalidDate {
            row,
            column: COL_START,
            value: self.start.clone(),
        })?;
        let end = parse_date(&self.end).ok_or_else(|| LoadError::InvalidDate {
            row,
            column: COL_END,
            value: self.end.clone(),
        })?;

        if end < start {
            return Err(LoadError::InvalidRecord {
                row,
                reason: format!("end date {end} is before start date {start}"),
            });
        }

        let derived = years_between(start, end);
        let supplied = self
            .duration
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let duration = match supplied {
            None => derived,
            Some(text) => {
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| LoadError::InvalidRecord {
                        row,
                        reason: format!("{COL_DURATION} '{text}' is not a number"),
                    })?;
                if (value - derived).abs() <= DURATION_TOLERANCE {
                    value
                } else {
                    log::warn!(
                        "Row {row}: {COL_DURATION} {value} disagrees with dates ({derived:.2} years); using dates"
                    );
                    derived
                }
            }
        };

        Ok(DeviceRecord {
            name: self.name.trim().to_string(),
            brand: self.brand.trim().to_string(),
            category: self.category.trim().to_string(),
            start,
            end,
            duration,
            reason: self.reason.trim().to_string(),
        })
    }
}

/// Parse the date layouts spreadsheets commonly export.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Number of leading columns that are a positional index rather than data.
fn index_columns(headers: &csv::StringRecord) -> usize {
    match headers.get(0) {
        Some(first) => {
            let first = first.trim().to_ascii_lowercase();
            let is_index = first.is_empty() || INDEX_HEADERS.contains(&first.as_str());
            usize::from(is_index)
        }
        None => 0,
    }
}

/// Drop a leading index column and check the required columns are present.
/// Returns the number of skipped leading cells and the remaining headers.
fn data_headers(raw: &csv::StringRecord) -> Result<(usize, csv::StringRecord), LoadError> {
    let skip = index_columns(raw);
    if skip > 0 {
        log::debug!("Dropping leading index column '{}'", &raw[0]);
    }
    let headers: csv::StringRecord = raw.iter().skip(skip).map(str::trim).collect();

    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(LoadError::MissingColumn(col.to_string()));
        }
    }
    Ok((skip, headers))
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

/// Read the first worksheet: a header row with the lifecycle column names
/// (an unnamed index column in front is dropped), one device per row after it.
/// Date-formatted cells become ISO dates; blank rows are skipped.
fn read_excel(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(LoadError::Empty)??;

    let mut sheet_rows = range.rows();
    let Some(header_cells) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let raw_headers: csv::StringRecord = header_cells.iter().map(excel_cell).collect();
    let (skip, headers) = data_headers(&raw_headers)?;

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let record: csv::StringRecord = cells.iter().skip(skip).map(excel_cell).collect();
        rows.push(record.deserialize::<RawRow>(Some(&headers))?);
    }
    Ok(rows)
}

fn excel_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the lifecycle column names, optionally
/// preceded by an unnamed index column (`df.to_csv()` default).
fn read_csv(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let raw_headers = reader.headers()?.clone();

    let (skip, headers) = data_headers(&raw_headers)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cells: csv::StringRecord = record.iter().skip(skip).collect();
        rows.push(cells.deserialize::<RawRow>(Some(&headers))?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "Device Name": "Pebble Time",
///     "Brand": "Pebble",
///     "Device Category": "Smartwatch",
///     "Start Date": 1430438400000,
///     "End Date": "2018-06-30",
///     "Duration": 3.2,
///     "Reason for Discontinuing": "Company acquired"
///   }
/// ]
/// ```
///
/// Dates may be strings or epoch milliseconds (the Pandas default).
fn read_json(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root.as_array().ok_or_else(|| LoadError::InvalidRecord {
        row: 0,
        reason: "expected a top-level JSON array".to_string(),
    })?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec.as_object().ok_or_else(|| LoadError::InvalidRecord {
                row: i + 1,
                reason: "not a JSON object".to_string(),
            })?;
            let field = |col: &str, is_date: bool| -> Result<String, LoadError> {
                obj.get(col)
                    .map(|v| json_cell(v, is_date))
                    .ok_or_else(|| LoadError::MissingColumn(col.to_string()))
            };
            Ok(RawRow {
                name: field(COL_NAME, false)?,
                brand: field(COL_BRAND, false)?,
                category: field(COL_CATEGORY, false)?,
                start: field(COL_START, true)?,
                end: field(COL_END, true)?,
                duration: obj.get(COL_DURATION).map(|v| json_cell(v, false)),
                reason: field(COL_REASON, false)?,
            })
        })
        .collect()
}

fn json_cell(val: &JsonValue, is_date: bool) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) if is_date => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive().to_string())
            .unwrap_or_else(|| n.to_string()),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table with the lifecycle column names.
///
/// Date columns may be `Date32`, `Date64`, any `Timestamp` unit or strings;
/// `Duration` may be any float or integer type. Works with files written by
/// both Pandas and Polars. Index columns are ignored because lookup is by name.
fn read_parquet(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        let column = |name: &str| -> Result<ArrayRef, LoadError> {
            schema
                .index_of(name)
                .map(|i| Arc::clone(batch.column(i)))
                .map_err(|_| LoadError::MissingColumn(name.to_string()))
        };

        let name = column(COL_NAME)?;
        let brand = column(COL_BRAND)?;
        let category = column(COL_CATEGORY)?;
        let start = column(COL_START)?;
        let end = column(COL_END)?;
        let reason = column(COL_REASON)?;
        let duration = column(COL_DURATION).ok();

        for row in 0..batch.num_rows() {
            let row_no = rows.len() + 1;
            rows.push(RawRow {
                name: arrow_cell(&name, row, row_no, COL_NAME)?,
                brand: arrow_cell(&brand, row, row_no, COL_BRAND)?,
                category: arrow_cell(&category, row, row_no, COL_CATEGORY)?,
                start: arrow_cell(&start, row, row_no, COL_START)?,
                end: arrow_cell(&end, row, row_no, COL_END)?,
                duration: duration
                    .as_ref()
                    .map(|col| arrow_cell(col, row, row_no, COL_DURATION))
                    .transpose()?,
                reason: arrow_cell(&reason, row, row_no, COL_REASON)?,
            });
        }
    }

    Ok(rows)
}

/// Render one Arrow cell as text; temporal types become ISO dates.
fn arrow_cell(
    col: &ArrayRef,
    row: usize,
    row_no: usize,
    column: &'static str,
) -> Result<String, LoadError> {
    if col.is_null(row) {
        return Ok(String::new());
    }

    let datetime = |dt: Option<NaiveDateTime>| -> Result<String, LoadError> {
        dt.map(|dt| dt.date().to_string())
            .ok_or_else(|| LoadError::InvalidDate {
                row: row_no,
                column,
                value: format!("{:?}", col.data_type()),
            })
    };

    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        DataType::Float64 => Ok(col.as_primitive::<Float64Type>().value(row).to_string()),
        DataType::Float32 => Ok(col.as_primitive::<Float32Type>().value(row).to_string()),
        DataType::Int64 => Ok(col.as_primitive::<Int64Type>().value(row).to_string()),
        DataType::Int32 => Ok(col.as_primitive::<Int32Type>().value(row).to_string()),
        DataType::Date32 => datetime(date32_to_datetime(
            col.as_primitive::<Date32Type>().value(row),
        )),
        DataType::Date64 => datetime(date64_to_datetime(
            col.as_primitive::<Date64Type>().value(row),
        )),
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => {
                    timestamp_s_to_datetime(col.as_primitive::<TimestampSecondType>().value(row))
                }
                TimeUnit::Millisecond => timestamp_ms_to_datetime(
                    col.as_primitive::<TimestampMillisecondType>().value(row),
                ),
                TimeUnit::Microsecond => timestamp_us_to_datetime(
                    col.as_primitive::<TimestampMicrosecondType>().value(row),
                ),
                TimeUnit::Nanosecond => timestamp_ns_to_datetime(
                    col.as_primitive::<TimestampNanosecondType>().value(row),
                ),
            };
            datetime(dt)
        }
        other => Err(LoadError::InvalidRecord {
            row: row_no,
            reason: format!("unsupported type {other:?} in column '{column}'"),
        }),
    }
}
