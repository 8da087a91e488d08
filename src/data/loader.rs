use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::util::display::array_value_to_string;
use chrono::{NaiveDate, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{calendar_fields, SaleRecord, SalesDataset};

/// Accepted `Date` layouts, tried in order.
const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
/// Accepted `Time` layouts, tried in order.
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

const REQUIRED_COLUMNS: [&str; 15] = [
    "Branch",
    "City",
    "Customer type",
    "Gender",
    "Product line",
    "Unit price",
    "Quantity",
    "Tax 5%",
    "Total",
    "Date",
    "Time",
    "Payment",
    "cogs",
    "gross income",
    "Rating",
];
const INVOICE_COLUMN: &str = "Invoice ID";
const GROSS_MARGIN_COLUMN: &str = "gross margin percentage";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the supermarket sales columns
/// * `.json`    – `[{ "City": "Yangon", "Total": 548.97, ... }, ...]`
/// * `.parquet` – flat table with the same column names
///
/// Rows with an unparseable date or time, or a missing/invalid required cell,
/// are dropped without failing the load.
pub fn load_file(path: &Path) -> Result<SalesDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Row parsing shared by every format
// ---------------------------------------------------------------------------

/// A source row addressable by column name.
trait RowSource {
    /// Trimmed, non-empty cell text for `column`.
    fn field(&self, column: &str) -> Option<&str>;
}

struct CsvRow<'a> {
    index: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl RowSource for CsvRow<'_> {
    fn field(&self, column: &str) -> Option<&str> {
        let idx = *self.index.get(column)?;
        self.record
            .get(idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl RowSource for BTreeMap<String, String> {
    fn field(&self, column: &str) -> Option<&str> {
        self.get(column).map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

/// Why a row was dropped.
#[derive(Debug, Error, PartialEq)]
enum RowError {
    #[error("missing value for '{0}'")]
    Missing(&'static str),
    #[error("'{column}' value '{value}' is not a number")]
    NotNumeric { column: &'static str, value: String },
    #[error("unparseable date '{0}'")]
    Date(String),
    #[error("unparseable time '{0}'")]
    Time(String),
}

fn text<R: RowSource + ?Sized>(row: &R, column: &'static str) -> Result<String, RowError> {
    row.field(column)
        .map(str::to_string)
        .ok_or(RowError::Missing(column))
}

fn number<R: RowSource + ?Sized>(row: &R, column: &'static str) -> Result<f64, RowError> {
    let raw = row.field(column).ok_or(RowError::Missing(column))?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RowError::NotNumeric {
            column,
            value: raw.to_string(),
        }),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

fn parse_record<R: RowSource + ?Sized>(row: &R) -> Result<SaleRecord, RowError> {
    let raw_date = row.field("Date").ok_or(RowError::Missing("Date"))?;
    let date = parse_date(raw_date).ok_or_else(|| RowError::Date(raw_date.to_string()))?;
    let raw_time = row.field("Time").ok_or(RowError::Missing("Time"))?;
    let time = parse_time(raw_time).ok_or_else(|| RowError::Time(raw_time.to_string()))?;
    let (hour, month, day) = calendar_fields(date, time);

    // The margin column is optional, but a present-and-garbled cell still
    // disqualifies the row.
    let gross_margin_pct = match row.field(GROSS_MARGIN_COLUMN) {
        Some(_) => Some(number(row, GROSS_MARGIN_COLUMN)?),
        None => None,
    };

    Ok(SaleRecord {
        invoice_id: row.field(INVOICE_COLUMN).map(str::to_string),
        branch: text(row, "Branch")?,
        city: text(row, "City")?,
        customer_type: text(row, "Customer type")?,
        gender: text(row, "Gender")?,
        product_line: text(row, "Product line")?,
        payment: text(row, "Payment")?,
        unit_price: number(row, "Unit price")?,
        quantity: number(row, "Quantity")?,
        tax: number(row, "Tax 5%")?,
        total: number(row, "Total")?,
        cogs: number(row, "cogs")?,
        gross_margin_pct,
        gross_income: number(row, "gross income")?,
        rating: number(row, "Rating")?,
        date,
        time,
        hour,
        month,
        day,
    })
}

fn check_required_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<bool> {
    let present: Vec<&str> = headers.into_iter().collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !present.contains(col))
        .collect();
    if !missing.is_empty() {
        bail!("missing required column(s): {}", missing.join(", "));
    }
    Ok(present.contains(&GROSS_MARGIN_COLUMN))
}

/// Accumulates parsed rows and counts the dropped ones.
#[derive(Default)]
struct RecordSink {
    records: Vec<SaleRecord>,
    dropped: usize,
}

impl RecordSink {
    fn push<R: RowSource + ?Sized>(&mut self, row_no: usize, row: &R) {
        match parse_record(row) {
            Ok(rec) => self.records.push(rec),
            Err(e) => {
                log::debug!("Dropping row {row_no}: {e}");
                self.dropped += 1;
            }
        }
    }

    fn finish(self, has_gross_margin: bool) -> SalesDataset {
        log::info!(
            "Parsed {} sales records ({} malformed rows dropped)",
            self.records.len(),
            self.dropped
        );
        SalesDataset::from_records(self.records, has_gross_margin)
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names (surrounding whitespace ignored).
/// Short rows are accepted and dropped if they lack a required cell.
fn load_csv(path: &Path) -> Result<SalesDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let has_gross_margin = check_required_columns(headers.iter().map(String::as_str))?;

    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, name) in headers.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }

    let mut sink = RecordSink::default();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        sink.push(
            row_no,
            &CsvRow {
                index: &index,
                record: &record,
            },
        );
    }

    Ok(sink.finish(has_gross_margin))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Branch": "A", "City": "Yangon", "Total": 548.9715,
///     "Date": "1/5/2019", "Time": "13:08", ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<SalesDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut has_gross_margin = false;
    if let Some(first) = rows.first() {
        let obj = first.as_object().context("Row 0 is not a JSON object")?;
        has_gross_margin = check_required_columns(obj.keys().map(|k| k.trim()))?;
    }

    let mut sink = RecordSink::default();
    for (row_no, value) in rows.iter().enumerate() {
        let obj = value
            .as_object()
            .with_context(|| format!("Row {row_no} is not a JSON object"))?;
        let fields: BTreeMap<String, String> = obj
            .iter()
            .filter_map(|(k, v)| json_to_text(v).map(|s| (k.trim().to_string(), s)))
            .collect();
        sink.push(row_no, &fields);
    }

    Ok(sink.finish(has_gross_margin))
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding the sales table.
///
/// Cells of any primitive Arrow type are rendered to text and parsed with the
/// same rules as CSV, so files written by Pandas (`df.to_parquet()`) or
/// Polars (`df.write_parquet()`) load the same way. Temporal `Date` and `Time`
/// columns go through [`temporal_column`] first.
fn load_parquet(path: &Path) -> Result<SalesDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().trim().to_string())
        .collect();
    let has_gross_margin = check_required_columns(column_names.iter().map(String::as_str))?;

    let reader = builder.build().context("building parquet reader")?;

    let mut sink = RecordSink::default();
    let mut row_no = 0usize;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = column_names
            .iter()
            .zip(batch.columns())
            .map(|(name, column)| temporal_column(name, column))
            .collect::<Result<Vec<_>>>()?;
        for row in 0..batch.num_rows() {
            let mut fields = BTreeMap::new();
            for (name, column) in column_names.iter().zip(&columns) {
                if column.is_null(row) {
                    continue;
                }
                let cell = array_value_to_string(column, row)
                    .with_context(|| format!("Row {row_no}: failed to read '{name}'"))?;
                fields.insert(name.clone(), cell);
            }
            sink.push(row_no, &fields);
            row_no += 1;
        }
    }

    Ok(sink.finish(has_gross_margin))
}

/// Timestamp `Date` columns (Pandas writes parsed dates as `Timestamp(ns)`)
/// are cast to `Date32`, and timestamp `Time` columns to their time of day,
/// so both render in layouts the row parser accepts.
fn temporal_column(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    let target = match (name, column.data_type()) {
        ("Date", DataType::Timestamp(_, _) | DataType::Date64) => DataType::Date32,
        ("Time", DataType::Timestamp(_, _)) => DataType::Time64(TimeUnit::Microsecond),
        _ => return Ok(Arc::clone(column)),
    };
    cast(column, &target).with_context(|| format!("converting '{name}' to {target}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::array::{Float64Array, StringArray, TimestampNanosecondArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::NumericColumn;

    const HEADER: &str = "Invoice ID,Branch,City,Customer type,Gender,Product line,Unit price,Quantity,Tax 5%,Total,Date,Time,Payment,cogs,gross margin percentage,gross income,Rating";

    fn write_temp(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(ext)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn sample_csv() -> String {
        [
            HEADER,
            "750-67-8428,A,Yangon,Member,Female,Health and beauty,74.69,7,26.1415,548.9715,1/5/2019,13:08,Ewallet,522.83,4.761904762,26.1415,9.1",
            "226-31-3081,C,Naypyitaw,Normal,Female,Electronic accessories,15.28,5,3.82,80.22,3/8/2019,10:29,Cash,76.4,4.761904762,3.82,9.6",
            // bad date
            "631-41-3108,A,Yangon,Normal,Male,Home and lifestyle,46.33,7,16.2155,340.5255,13/45/2019,13:23,Credit card,324.31,4.761904762,16.2155,7.4",
            // bad time
            "123-19-1176,A,Yangon,Member,Male,Health and beauty,58.22,8,23.288,489.048,1/27/2019,noon,Ewallet,465.76,4.761904762,23.288,8.4",
            "373-73-7910,A,Yangon,Normal,Male,Sports and travel,86.31,7,30.2085,634.3785,2/8/2019,10:37,Ewallet,604.17,4.761904762,30.2085,5.3",
            // empty date
            "699-14-3026,C,Naypyitaw,Normal,Male,Electronic accessories,85.39,7,29.8865,627.6165,,18:30,Ewallet,597.73,4.761904762,29.8865,4.1",
        ]
        .join("\n")
    }

    #[test]
    fn csv_keeps_only_rows_with_valid_date_and_time() {
        let file = write_temp(".csv", &sample_csv());
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 3);
        let first = &ds.records[0];
        assert_eq!(first.invoice_id.as_deref(), Some("750-67-8428"));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2019, 1, 5).unwrap());
        assert_eq!(first.hour, 13);
        assert_eq!(first.month, "January");
        assert_eq!(first.day, "Saturday");
        assert!(ds.numeric_columns.contains(&NumericColumn::GrossMarginPct));
    }

    #[test]
    fn csv_headers_are_trimmed_and_short_rows_dropped() {
        let header = HEADER.replace(",Total,", ", Total ,");
        let contents = format!(
            "{header}\n\
             750-67-8428,A,Yangon,Member,Female,Health and beauty,74.69,7,26.1415,548.9715,1/5/2019,13:08,Ewallet,522.83,4.761904762,26.1415,9.1\n\
             226-31-3081,C,Naypyitaw,Normal,Female\n"
        );
        let file = write_temp(".csv", &contents);
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert!((ds.records[0].total - 548.9715).abs() < 1e-9);
    }

    #[test]
    fn csv_non_numeric_measure_drops_row() {
        let contents = format!(
            "{HEADER}\n\
             750-67-8428,A,Yangon,Member,Female,Health and beauty,n/a,7,26.1415,548.9715,1/5/2019,13:08,Ewallet,522.83,4.761904762,26.1415,9.1\n"
        );
        let file = write_temp(".csv", &contents);
        assert_eq!(load_file(file.path()).unwrap().len(), 0);
    }

    #[test]
    fn csv_missing_required_column_is_an_error() {
        let file = write_temp(".csv", "Branch,City,Total\nA,Yangon,10.0\n");
        let err = load_file(file.path()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("missing required column"), "{msg}");
        assert!(msg.contains("Rating"), "{msg}");
    }

    #[test]
    fn optional_margin_column_may_be_absent() {
        let header = HEADER.replace(",gross margin percentage", "");
        let contents = format!(
            "{header}\n\
             750-67-8428,A,Yangon,Member,Female,Health and beauty,74.69,7,26.1415,548.9715,1/5/2019,13:08,Ewallet,522.83,26.1415,9.1\n"
        );
        let file = write_temp(".csv", &contents);
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].gross_margin_pct, None);
        assert!(!ds.numeric_columns.contains(&NumericColumn::GrossMarginPct));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = write_temp(".xlsx", "");
        let err = load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }

    #[test]
    fn json_records_are_loaded() {
        let contents = r#"[
            {"Branch": "A", "City": "Yangon", "Customer type": "Member", "Gender": "Female",
             "Product line": "Health and beauty", "Unit price": 74.69, "Quantity": 7,
             "Tax 5%": 26.1415, "Total": 548.9715, "Date": "1/5/2019", "Time": "13:08",
             "Payment": "Ewallet", "cogs": 522.83, "gross income": 26.1415, "Rating": 9.1},
            {"Branch": "B", "City": "Mandalay", "Customer type": "Normal", "Gender": "Male",
             "Product line": "Food and beverages", "Unit price": 10.0, "Quantity": 1,
             "Tax 5%": 0.5, "Total": 10.5, "Date": null, "Time": "09:00",
             "Payment": "Cash", "cogs": 10.0, "gross income": 0.5, "Rating": 6.0}
        ]"#;
        let file = write_temp(".json", contents);
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].quantity, 7.0);
        assert_eq!(ds.records[0].city, "Yangon");
    }

    #[test]
    fn json_must_be_an_array() {
        let file = write_temp(".json", r#"{"Branch": "A"}"#);
        assert!(load_file(file.path()).is_err());
    }

    /// One-row sales table with the given `Date` and `Time` columns.
    fn write_parquet(
        date: (DataType, ArrayRef),
        time: (DataType, ArrayRef),
    ) -> tempfile::NamedTempFile {
        let text_cols = [
            ("Branch", "A"),
            ("City", "Yangon"),
            ("Customer type", "Member"),
            ("Gender", "Female"),
            ("Product line", "Health and beauty"),
            ("Payment", "Ewallet"),
        ];
        let num_cols = [
            ("Unit price", 74.69),
            ("Quantity", 7.0),
            ("Tax 5%", 26.1415),
            ("Total", 548.9715),
            ("cogs", 522.83),
            ("gross income", 26.1415),
            ("Rating", 9.1),
        ];

        let mut fields = vec![
            Field::new("Date", date.0, false),
            Field::new("Time", time.0, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![date.1, time.1];
        for (name, value) in text_cols {
            fields.push(Field::new(name, DataType::Utf8, false));
            columns.push(Arc::new(StringArray::from(vec![value])));
        }
        for (name, value) in num_cols {
            fields.push(Field::new(name, DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from(vec![value])));
        }
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        file
    }

    fn text_column(value: &str) -> (DataType, ArrayRef) {
        (DataType::Utf8, Arc::new(StringArray::from(vec![value])))
    }

    fn timestamp_column(date: NaiveDate, time: NaiveTime) -> (DataType, ArrayRef) {
        let nanos = date.and_time(time).and_utc().timestamp_nanos_opt().unwrap();
        (
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            Arc::new(TimestampNanosecondArray::from(vec![nanos])),
        )
    }

    #[test]
    fn parquet_table_is_loaded() {
        let file = write_parquet(text_column("1/5/2019"), text_column("13:08"));
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].payment, "Ewallet");
        assert!((ds.records[0].rating - 9.1).abs() < 1e-9);
    }

    #[test]
    fn parquet_timestamp_date_and_time_are_read_by_type() {
        let day = NaiveDate::from_ymd_opt(2019, 1, 5).unwrap();
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let afternoon = NaiveTime::from_hms_opt(13, 8, 0).unwrap();

        let file = write_parquet(timestamp_column(day, midnight), text_column("13:08"));
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].date, day);
        assert_eq!(ds.records[0].time, afternoon);

        let file = write_parquet(
            timestamp_column(day, midnight),
            timestamp_column(day, afternoon),
        );
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].time, afternoon);
        assert_eq!(ds.records[0].hour, 13);
    }

    #[test]
    fn date_and_time_formats() {
        assert_eq!(parse_date("01/05/2019"), NaiveDate::from_ymd_opt(2019, 1, 5));
        assert_eq!(parse_date("2019-01-05"), NaiveDate::from_ymd_opt(2019, 1, 5));
        assert_eq!(parse_date("2019/13/01"), None);
        assert_eq!(parse_time("7:05"), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_time("25:00"), None);
    }
}
