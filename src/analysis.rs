use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::data::model::{Dimension, NumericColumn, SaleRecord, SalesDataset};

// ---------------------------------------------------------------------------
// Selection – a filtered view over the dataset
// ---------------------------------------------------------------------------

/// Borrowed view of the records at `indices`.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    dataset: &'a SalesDataset,
    indices: &'a [usize],
}

impl<'a> Selection<'a> {
    pub fn new(dataset: &'a SalesDataset, indices: &'a [usize]) -> Self {
        Self { dataset, indices }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a SaleRecord> + 'a {
        let records = &self.dataset.records;
        let indices = self.indices;
        indices.iter().map(move |&i| &records[i])
    }

    /// Sum of a numeric column, skipping records without a value.
    pub fn sum(&self, col: NumericColumn) -> f64 {
        self.iter().filter_map(|r| r.value(col)).sum()
    }

    /// Arithmetic mean of a numeric column, `None` when there is no value.
    pub fn mean(&self, col: NumericColumn) -> Option<f64> {
        let (sum, n) = self
            .iter()
            .filter_map(|r| r.value(col))
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }
}

// ---------------------------------------------------------------------------
// Key indicators
// ---------------------------------------------------------------------------

/// Numbers shown in the metric tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMetrics {
    /// Rows inside the date range (categorical filters not applied).
    pub transactions: usize,
    pub total_sales: f64,
    pub mean_rating: Option<f64>,
    pub gross_income: f64,
}

impl KeyMetrics {
    pub fn compute(selected: Selection<'_>, date_filtered_count: usize) -> Self {
        KeyMetrics {
            transactions: date_filtered_count,
            total_sales: selected.sum(NumericColumn::Total),
            mean_rating: selected.mean(NumericColumn::Rating),
            gross_income: selected.sum(NumericColumn::GrossIncome),
        }
    }
}

// ---------------------------------------------------------------------------
// Daily totals
// ---------------------------------------------------------------------------

/// `Total` summed per day, with the mean of those daily sums.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    pub points: Vec<(NaiveDate, f64)>,
    pub mean: Option<f64>,
    /// Median of the plotted dates; anchors the mean annotation.
    pub median_date: Option<NaiveDate>,
}

pub fn daily_totals(selected: Selection<'_>) -> DailySeries {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for rec in selected.iter() {
        *per_day.entry(rec.date).or_insert(0.0) += rec.total;
    }
    let points: Vec<(NaiveDate, f64)> = per_day.into_iter().collect();

    let mean = (!points.is_empty())
        .then(|| points.iter().map(|(_, v)| v).sum::<f64>() / points.len() as f64);

    let median_date = match points.len() {
        0 => None,
        n if n % 2 == 1 => Some(points[n / 2].0),
        n => {
            let lo = points[n / 2 - 1].0;
            let hi = points[n / 2].0;
            let half = (hi - lo).num_days() / 2;
            Some(lo + Days::new(half as u64))
        }
    };

    DailySeries {
        points,
        mean,
        median_date,
    }
}

// ---------------------------------------------------------------------------
// Group-by helpers
// ---------------------------------------------------------------------------

/// One named series of a pivot, aligned with [`GroupedSeries::categories`].
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// A two-level group-by unstacked into a table: one row per category, one
/// series per split value. Missing combinations are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSeries {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

pub fn grouped_sum(
    selected: Selection<'_>,
    by: Dimension,
    split: Dimension,
    measure: NumericColumn,
) -> GroupedSeries {
    let mut cells: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    let mut categories: BTreeSet<&str> = BTreeSet::new();
    let mut splits: BTreeSet<&str> = BTreeSet::new();

    for rec in selected.iter() {
        let Some(v) = rec.value(measure) else {
            continue;
        };
        let (a, b) = (rec.dimension(by), rec.dimension(split));
        categories.insert(a);
        splits.insert(b);
        *cells.entry((a, b)).or_insert(0.0) += v;
    }

    let series = splits
        .iter()
        .map(|&s| Series {
            name: s.to_string(),
            values: categories
                .iter()
                .map(|&c| cells.get(&(c, s)).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    GroupedSeries {
        categories: categories.into_iter().map(str::to_string).collect(),
        series,
    }
}

/// Record counts per value, most frequent first (ties by value).
pub fn value_counts(selected: Selection<'_>, dim: Dimension) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for rec in selected.iter() {
        *counts.entry(rec.dimension(dim)).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Sum of `measure` per value of `dim`, ordered by value.
pub fn sum_by(selected: Selection<'_>, dim: Dimension, measure: NumericColumn) -> Vec<(String, f64)> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for rec in selected.iter() {
        if let Some(v) = rec.value(measure) {
            *sums.entry(rec.dimension(dim)).or_insert(0.0) += v;
        }
    }
    sums.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pairwise Pearson correlation between numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<NumericColumn>,
    /// Row-major, `columns.len()` squared. NaN where undefined.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }
}

pub fn correlation_matrix<'a>(
    records: impl IntoIterator<Item = &'a SaleRecord>,
    columns: &[NumericColumn],
) -> CorrelationMatrix {
    let rows: Vec<Vec<Option<f64>>> = records
        .into_iter()
        .map(|r| columns.iter().map(|&c| r.value(c)).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let pairs = rows.iter().filter_map(|row| Some((row[i]?, row[j]?)));
            let r = pearson(pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    }
}

/// Pearson coefficient; NaN for fewer than two pairs or zero variance.
fn pearson(pairs: impl Iterator<Item = (f64, f64)>) -> f64 {
    let pairs: Vec<(f64, f64)> = pairs.collect();
    let n = pairs.len();
    if n < 2 {
        return f64::NAN;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Round to two decimals, as the heatmap annotations show.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// 3D scatter axes
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    #[error("Not enough numeric columns to build a 3D plot (found {found}, need 3).")]
    InsufficientNumericColumns { found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterAxes {
    pub x: NumericColumn,
    pub y: NumericColumn,
    pub z: NumericColumn,
}

/// The resolved axes plus the options each picker may offer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChoice {
    pub axes: ScatterAxes,
    pub x_options: Vec<NumericColumn>,
    pub y_options: Vec<NumericColumn>,
    pub z_options: Vec<NumericColumn>,
}

/// Resolve the X/Y/Z columns for the 3D view.
///
/// X may be any numeric column, Y any column but X, Z any column but X and Y.
/// A requested column that is not on offer falls back to the first option.
pub fn choose_scatter_axes(
    available: &[NumericColumn],
    x: Option<NumericColumn>,
    y: Option<NumericColumn>,
    z: Option<NumericColumn>,
) -> Result<ScatterChoice, ViewError> {
    if available.len() < 3 {
        return Err(ViewError::InsufficientNumericColumns {
            found: available.len(),
        });
    }

    fn pick(wanted: Option<NumericColumn>, options: &[NumericColumn]) -> NumericColumn {
        wanted
            .filter(|c| options.contains(c))
            .unwrap_or(options[0])
    }

    let x_options = available.to_vec();
    let x = pick(x, &x_options);
    let y_options: Vec<NumericColumn> = x_options.iter().copied().filter(|&c| c != x).collect();
    let y = pick(y, &y_options);
    let z_options: Vec<NumericColumn> = y_options.iter().copied().filter(|&c| c != y).collect();
    let z = pick(z, &z_options);

    Ok(ScatterChoice {
        axes: ScatterAxes { x, y, z },
        x_options,
        y_options,
        z_options,
    })
}

/// `(x, y, z)` for every selected record that has all three values.
pub fn scatter_points(selected: Selection<'_>, axes: ScatterAxes) -> Vec<[f64; 3]> {
    selected
        .iter()
        .filter_map(|r| Some([r.value(axes.x)?, r.value(axes.y)?, r.value(axes.z)?]))
        .collect()
}

// ---------------------------------------------------------------------------
// DashboardView – everything the tabs draw for one filter state
// ---------------------------------------------------------------------------

/// Aggregates recomputed whenever the filters change.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub metrics: Option<KeyMetrics>,
    pub daily: DailySeries,
    pub city_payment_totals: GroupedSeries,
    pub gender_product_income: GroupedSeries,
    pub product_counts: Vec<(String, usize)>,
    pub product_income: Vec<(String, f64)>,
}

impl DashboardView {
    pub fn build(selected: Selection<'_>, date_filtered_count: usize) -> Self {
        DashboardView {
            metrics: Some(KeyMetrics::compute(selected, date_filtered_count)),
            daily: daily_totals(selected),
            city_payment_totals: grouped_sum(
                selected,
                Dimension::City,
                Dimension::Payment,
                NumericColumn::Total,
            ),
            gender_product_income: grouped_sum(
                selected,
                Dimension::Gender,
                Dimension::ProductLine,
                NumericColumn::GrossIncome,
            ),
            product_counts: value_counts(selected, Dimension::ProductLine),
            product_income: sum_by(selected, Dimension::ProductLine, NumericColumn::GrossIncome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filtered_indices, FilterState};
    use crate::data::model::tests::record;

    fn dataset() -> SalesDataset {
        let mut a = record("2019-01-01", "Yangon", "Cash", 100.0);
        a.rating = 8.0;
        a.product_line = "Food and beverages".into();
        let mut b = record("2019-01-01", "Yangon", "Ewallet", 50.0);
        b.rating = 6.0;
        let mut c = record("2019-01-03", "Mandalay", "Cash", 25.5);
        c.gender = "Male".into();
        c.rating = 4.0;
        let d = record("2019-01-04", "Mandalay", "Cash", 10.0);
        SalesDataset::from_records(vec![a, b, c, d], false)
    }

    fn all(ds: &SalesDataset) -> Vec<usize> {
        (0..ds.len()).collect()
    }

    #[test]
    fn filtered_total_matches_manual_sum() {
        let ds = dataset();
        let mut filters = FilterState::new(&ds);
        filters.toggle(Dimension::City, "Mandalay");
        let idx = filtered_indices(&ds, &filters);
        let manual: f64 = idx.iter().map(|&i| ds.records[i].total).sum();
        let sel = Selection::new(&ds, &idx);
        assert_eq!(sel.sum(NumericColumn::Total), manual);
        assert_eq!(manual, 150.0);
    }

    #[test]
    fn metrics_use_date_count_for_transactions() {
        let ds = dataset();
        let idx = vec![0, 1];
        let m = KeyMetrics::compute(Selection::new(&ds, &idx), 4);
        assert_eq!(m.transactions, 4);
        assert_eq!(m.total_sales, 150.0);
        assert_eq!(m.mean_rating, Some(7.0));
    }

    #[test]
    fn empty_selection_has_no_mean_rating() {
        let ds = dataset();
        let m = KeyMetrics::compute(Selection::new(&ds, &[]), 0);
        assert_eq!(m.mean_rating, None);
        assert_eq!(m.total_sales, 0.0);
    }

    #[test]
    fn daily_totals_group_by_date() {
        let ds = dataset();
        let idx = all(&ds);
        let daily = daily_totals(Selection::new(&ds, &idx));
        let days: Vec<f64> = daily.points.iter().map(|p| p.1).collect();
        assert_eq!(days, [150.0, 25.5, 10.0]);
        assert_eq!(daily.mean, Some(185.5 / 3.0));
        assert_eq!(daily.median_date, NaiveDate::from_ymd_opt(2019, 1, 3));
    }

    #[test]
    fn median_of_even_dates_is_midpoint() {
        let ds = dataset();
        let idx = vec![0, 3];
        let daily = daily_totals(Selection::new(&ds, &idx));
        assert_eq!(daily.median_date, NaiveDate::from_ymd_opt(2019, 1, 2));
    }

    #[test]
    fn grouped_sum_fills_missing_with_zero() {
        let ds = dataset();
        let idx = all(&ds);
        let g = grouped_sum(
            Selection::new(&ds, &idx),
            Dimension::City,
            Dimension::Payment,
            NumericColumn::Total,
        );
        assert_eq!(g.categories, ["Mandalay", "Yangon"]);
        assert_eq!(g.series.len(), 2);
        assert_eq!(g.series[0].name, "Cash");
        assert_eq!(g.series[0].values, [35.5, 100.0]);
        assert_eq!(g.series[1].name, "Ewallet");
        assert_eq!(g.series[1].values, [0.0, 50.0]);
    }

    #[test]
    fn value_counts_sorted_by_frequency() {
        let ds = dataset();
        let idx = all(&ds);
        let counts = value_counts(Selection::new(&ds, &idx), Dimension::ProductLine);
        assert_eq!(
            counts,
            [
                ("Health and beauty".to_string(), 3),
                ("Food and beverages".to_string(), 1)
            ]
        );
    }

    #[test]
    fn sum_by_orders_by_value() {
        let ds = dataset();
        let idx = all(&ds);
        let sums = sum_by(Selection::new(&ds, &idx), Dimension::City, NumericColumn::Total);
        assert_eq!(
            sums,
            [("Mandalay".to_string(), 35.5), ("Yangon".to_string(), 150.0)]
        );
    }

    #[test]
    fn correlation_of_linear_columns_is_one() {
        let ds = dataset();
        // tax and cogs are both linear in total for the test records.
        let m = correlation_matrix(
            &ds.records,
            &[NumericColumn::Total, NumericColumn::Tax, NumericColumn::Quantity],
        );
        assert_eq!(round2(m.get(0, 1)), 1.0);
        assert_eq!(round2(m.get(1, 0)), 1.0);
        assert_eq!(round2(m.get(0, 0)), 1.0);
        // Quantity is constant: undefined.
        assert!(m.get(0, 2).is_nan());
    }

    #[test]
    fn correlation_of_opposed_columns_is_minus_one() {
        let ds = dataset();
        let rows: Vec<SaleRecord> = ds
            .records
            .iter()
            .cloned()
            .map(|mut r| {
                r.rating = 10.0 - r.total / 20.0;
                r
            })
            .collect();
        let m = correlation_matrix(&rows, &[NumericColumn::Total, NumericColumn::Rating]);
        assert_eq!(round2(m.get(0, 1)), -1.0);
    }

    #[test]
    fn too_few_numeric_columns_is_an_error() {
        let err = choose_scatter_axes(
            &[NumericColumn::Total, NumericColumn::Rating],
            None,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, ViewError::InsufficientNumericColumns { found: 2 });
        assert!(choose_scatter_axes(&[], None, None, None).is_err());
    }

    #[test]
    fn scatter_axes_are_distinct() {
        let cols = [
            NumericColumn::Total,
            NumericColumn::Rating,
            NumericColumn::Quantity,
        ];
        let choice = choose_scatter_axes(&cols, None, None, None).unwrap();
        assert_eq!(
            choice.axes,
            ScatterAxes {
                x: NumericColumn::Total,
                y: NumericColumn::Rating,
                z: NumericColumn::Quantity
            }
        );
        assert_eq!(choice.z_options, [NumericColumn::Quantity]);

        // A Y equal to X is not on offer and falls back.
        let choice = choose_scatter_axes(
            &cols,
            Some(NumericColumn::Rating),
            Some(NumericColumn::Rating),
            Some(NumericColumn::Rating),
        )
        .unwrap();
        assert_eq!(choice.axes.x, NumericColumn::Rating);
        assert_eq!(choice.axes.y, NumericColumn::Total);
        assert_eq!(choice.axes.z, NumericColumn::Quantity);
    }

    #[test]
    fn scatter_points_skip_missing_values() {
        let mut ds = dataset();
        ds.records[0].gross_margin_pct = Some(4.76);
        let idx = all(&ds);
        let axes = ScatterAxes {
            x: NumericColumn::Total,
            y: NumericColumn::Rating,
            z: NumericColumn::GrossMarginPct,
        };
        let pts = scatter_points(Selection::new(&ds, &idx), axes);
        assert_eq!(pts, [[100.0, 8.0, 4.76]]);
    }
}
