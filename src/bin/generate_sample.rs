use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;

const ROWS: usize = 1000;
/// Every n-th row gets a garbled date or time, to exercise row dropping.
const GARBLE_EVERY: usize = 97;
const GROSS_MARGIN_PCT: f64 = 4.761904762;

const BRANCHES: [(&str, &str); 3] = [("A", "Yangon"), ("B", "Mandalay"), ("C", "Naypyitaw")];
const CUSTOMER_TYPES: [&str; 2] = ["Member", "Normal"];
const GENDERS: [&str; 2] = ["Female", "Male"];
const PAYMENTS: [&str; 3] = ["Cash", "Credit card", "Ewallet"];
const PRODUCT_LINES: [&str; 6] = [
    "Electronic accessories",
    "Fashion accessories",
    "Food and beverages",
    "Health and beauty",
    "Home and lifestyle",
    "Sports and travel",
];

const TEXT_COLUMNS: [&str; 9] = [
    "Invoice ID",
    "Branch",
    "City",
    "Customer type",
    "Gender",
    "Product line",
    "Date",
    "Time",
    "Payment",
];
const NUMBER_COLUMNS: [&str; 8] = [
    "Unit price",
    "Quantity",
    "Tax 5%",
    "Total",
    "cogs",
    "gross margin percentage",
    "gross income",
    "Rating",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

/// One synthetic transaction, columns in `TEXT_COLUMNS` / `NUMBER_COLUMNS` order.
struct Row {
    text: [String; 9],
    numbers: [f64; 8],
}

fn generate_row(rng: &mut SimpleRng, i: usize, first_day: NaiveDate) -> Row {
    let (branch, city) = BRANCHES[rng.below(BRANCHES.len())];
    let unit_price = round_to(rng.range(10.0, 100.0), 2);
    let quantity = (1 + rng.below(10)) as f64;
    let cogs = round_to(unit_price * quantity, 2);
    let tax = round_to(cogs * 0.05, 4);
    let total = round_to(cogs + tax, 4);
    let rating = round_to(rng.range(4.0, 10.0), 1);

    let date = first_day + Days::new(rng.below(89) as u64);
    let mut date_text = date.format("%-m/%-d/%Y").to_string();
    let mut time_text = format!("{}:{:02}", 10 + rng.below(11), rng.below(60));
    if i % GARBLE_EVERY == GARBLE_EVERY - 1 {
        if i % 2 == 0 {
            date_text = "13/45/2019".to_string();
        } else {
            time_text = "--:--".to_string();
        }
    }

    let invoice = format!(
        "{:03}-{:02}-{:04}",
        rng.below(1000),
        rng.below(100),
        rng.below(10000)
    );

    Row {
        text: [
            invoice,
            branch.to_string(),
            city.to_string(),
            rng.pick(&CUSTOMER_TYPES).to_string(),
            rng.pick(&GENDERS).to_string(),
            rng.pick(&PRODUCT_LINES).to_string(),
            date_text,
            time_text,
            rng.pick(&PAYMENTS).to_string(),
        ],
        numbers: [unit_price, quantity, tax, total, cogs, GROSS_MARGIN_PCT, tax, rating],
    }
}

fn write_csv(path: &str, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    let header: Vec<&str> = TEXT_COLUMNS.iter().chain(NUMBER_COLUMNS.iter()).copied().collect();
    writer.write_record(&header)?;
    for row in rows {
        let mut record: Vec<String> = row.text.to_vec();
        record.extend(row.numbers.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, rows: &[Row]) -> Result<()> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for (k, name) in TEXT_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Utf8, false));
        let values: Vec<&str> = rows.iter().map(|r| r.text[k].as_str()).collect();
        columns.push(Arc::new(StringArray::from(values)));
    }
    for (k, name) in NUMBER_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Float64, false));
        let values: Vec<f64> = rows.iter().map(|r| r.numbers[k]).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let first_day = NaiveDate::from_ymd_opt(2019, 1, 1).context("invalid start date")?;

    let rows: Vec<Row> = (0..ROWS)
        .map(|i| generate_row(&mut rng, i, first_day))
        .collect();
    let garbled = ROWS / GARBLE_EVERY;

    write_csv("sample_sales.csv", &rows)?;
    write_parquet("sample_sales.parquet", &rows)?;

    println!(
        "Wrote {ROWS} transactions ({garbled} with a broken date or time) to \
         sample_sales.csv and sample_sales.parquet"
    );
    Ok(())
}
