use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

// ---------------------------------------------------------------------------
// Dimension – a categorical column usable as a filter
// ---------------------------------------------------------------------------

/// Categorical columns of the sales table that can be filtered on.
///
/// The declaration order is the order of the filter widgets in the side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    CustomerType,
    City,
    Branch,
    Payment,
    Gender,
    ProductLine,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::CustomerType,
        Dimension::City,
        Dimension::Branch,
        Dimension::Payment,
        Dimension::Gender,
        Dimension::ProductLine,
    ];

    /// Header name of the column in the source file.
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::CustomerType => "Customer type",
            Dimension::City => "City",
            Dimension::Branch => "Branch",
            Dimension::Payment => "Payment",
            Dimension::Gender => "Gender",
            Dimension::ProductLine => "Product line",
        }
    }

    /// Human readable label for widgets and axis titles.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::CustomerType => "Customer type",
            Dimension::City => "City",
            Dimension::Branch => "Branch",
            Dimension::Payment => "Payment method",
            Dimension::Gender => "Gender",
            Dimension::ProductLine => "Product line",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// NumericColumn – a numeric measure of a record
// ---------------------------------------------------------------------------

/// Numeric columns of a record, including the derived `Hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericColumn {
    UnitPrice,
    Quantity,
    Tax,
    Total,
    Cogs,
    GrossMarginPct,
    GrossIncome,
    Rating,
    Hour,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 9] = [
        NumericColumn::UnitPrice,
        NumericColumn::Quantity,
        NumericColumn::Tax,
        NumericColumn::Total,
        NumericColumn::Cogs,
        NumericColumn::GrossMarginPct,
        NumericColumn::GrossIncome,
        NumericColumn::Rating,
        NumericColumn::Hour,
    ];

    /// The measures shown in the correlation heatmap.
    pub const CORRELATED: [NumericColumn; 7] = [
        NumericColumn::UnitPrice,
        NumericColumn::Quantity,
        NumericColumn::Tax,
        NumericColumn::Total,
        NumericColumn::Cogs,
        NumericColumn::GrossIncome,
        NumericColumn::Rating,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            NumericColumn::UnitPrice => "Unit price",
            NumericColumn::Quantity => "Quantity",
            NumericColumn::Tax => "Tax 5%",
            NumericColumn::Total => "Total",
            NumericColumn::Cogs => "cogs",
            NumericColumn::GrossMarginPct => "gross margin percentage",
            NumericColumn::GrossIncome => "gross income",
            NumericColumn::Rating => "Rating",
            NumericColumn::Hour => "Hour",
        }
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// SaleRecord – one row of the sales table
// ---------------------------------------------------------------------------

/// A single sales transaction. Never mutated after load.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub invoice_id: Option<String>,
    pub branch: String,
    pub city: String,
    pub customer_type: String,
    pub gender: String,
    pub product_line: String,
    pub payment: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub tax: f64,
    pub total: f64,
    pub cogs: f64,
    pub gross_margin_pct: Option<f64>,
    pub gross_income: f64,
    pub rating: f64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Derived: hour of `time`.
    pub hour: u32,
    /// Derived: English month name of `date`.
    pub month: &'static str,
    /// Derived: English weekday name of `date`.
    pub day: &'static str,
}

impl SaleRecord {
    /// Value of a categorical dimension.
    pub fn dimension(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::CustomerType => &self.customer_type,
            Dimension::City => &self.city,
            Dimension::Branch => &self.branch,
            Dimension::Payment => &self.payment,
            Dimension::Gender => &self.gender,
            Dimension::ProductLine => &self.product_line,
        }
    }

    /// Value of a numeric column; `None` when the source had no such cell.
    pub fn value(&self, col: NumericColumn) -> Option<f64> {
        match col {
            NumericColumn::UnitPrice => Some(self.unit_price),
            NumericColumn::Quantity => Some(self.quantity),
            NumericColumn::Tax => Some(self.tax),
            NumericColumn::Total => Some(self.total),
            NumericColumn::Cogs => Some(self.cogs),
            NumericColumn::GrossMarginPct => self.gross_margin_pct,
            NumericColumn::GrossIncome => Some(self.gross_income),
            NumericColumn::Rating => Some(self.rating),
            NumericColumn::Hour => Some(f64::from(self.hour)),
        }
    }
}

/// Hour, month name and day name derived from a date and time.
pub fn calendar_fields(date: NaiveDate, time: NaiveTime) -> (u32, &'static str, &'static str) {
    const MONTHS: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ];
    const DAYS: [&str; 7] = [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ];
    let month = MONTHS[date.month0() as usize];
    let day = DAYS[date.weekday().num_days_from_monday() as usize];
    (time.hour(), month, day)
}

// ---------------------------------------------------------------------------
// SalesDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct SalesDataset {
    /// All records (rows).
    pub records: Vec<SaleRecord>,
    /// Numeric columns present in the source, in canonical order.
    pub numeric_columns: Vec<NumericColumn>,
    /// For each categorical dimension the sorted set of unique values.
    pub unique_values: BTreeMap<Dimension, BTreeSet<String>>,
    /// Earliest and latest record date, `None` when empty.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

impl SalesDataset {
    /// Build column indices from the loaded records.
    ///
    /// `has_gross_margin` tells whether the optional margin column was in the
    /// source header.
    pub fn from_records(records: Vec<SaleRecord>, has_gross_margin: bool) -> Self {
        let mut unique_values: BTreeMap<Dimension, BTreeSet<String>> = Dimension::ALL
            .iter()
            .map(|&dim| (dim, BTreeSet::new()))
            .collect();
        let mut date_bounds: Option<(NaiveDate, NaiveDate)> = None;

        for rec in &records {
            for dim in Dimension::ALL {
                if let Some(values) = unique_values.get_mut(&dim) {
                    if !values.contains(rec.dimension(dim)) {
                        values.insert(rec.dimension(dim).to_string());
                    }
                }
            }
            date_bounds = Some(match date_bounds {
                None => (rec.date, rec.date),
                Some((lo, hi)) => (lo.min(rec.date), hi.max(rec.date)),
            });
        }

        let numeric_columns = NumericColumn::ALL
            .into_iter()
            .filter(|&c| c != NumericColumn::GrossMarginPct || has_gross_margin)
            .collect();

        SalesDataset {
            records,
            numeric_columns,
            unique_values,
            date_bounds,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
