use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate};

use super::model::{Dimension, SaleRecord, SalesDataset};

/// Gender is offered as a fixed list rather than the values found in the data.
const GENDER_OPTIONS: [&str; 2] = ["Male", "Female"];

// ---------------------------------------------------------------------------
// Filter predicate: date range + selected values per dimension
// ---------------------------------------------------------------------------

/// The user's current filter selections.
///
/// A record passes when its date lies in `start..=end` and, for every
/// dimension, its value is in the selected set. An empty set therefore hides
/// every record.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub selections: BTreeMap<Dimension, BTreeSet<String>>,
}

impl FilterState {
    /// Initialise with the full date range and all options selected.
    ///
    /// An empty dataset has no bounds; both ends then sit on today, which
    /// keeps date pickers well inside chrono's range.
    pub fn new(dataset: &SalesDataset) -> Self {
        let (start, end) = dataset.date_bounds.unwrap_or_else(|| {
            let today = Local::now().date_naive();
            (today, today)
        });
        let selections = Dimension::ALL
            .iter()
            .map(|&dim| (dim, options(dataset, dim).into_iter().collect()))
            .collect();
        FilterState {
            start,
            end,
            selections,
        }
    }

    /// Whether `value` is selected for `dim`.
    pub fn is_selected(&self, dim: Dimension, value: &str) -> bool {
        self.selections
            .get(&dim)
            .is_some_and(|sel| sel.contains(value))
    }

    /// Toggle a single value in a dimension's selection.
    pub fn toggle(&mut self, dim: Dimension, value: &str) {
        let selected = self.selections.entry(dim).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Select every option of a dimension.
    pub fn select_all(&mut self, dataset: &SalesDataset, dim: Dimension) {
        self.selections
            .insert(dim, options(dataset, dim).into_iter().collect());
    }

    /// Deselect every option of a dimension.
    pub fn select_none(&mut self, dim: Dimension) {
        self.selections.insert(dim, BTreeSet::new());
    }

    /// Number of selected values for a dimension.
    pub fn selected_count(&self, dim: Dimension) -> usize {
        self.selections.get(&dim).map_or(0, BTreeSet::len)
    }

    /// Keep the date range inside the dataset's bounds.
    pub fn clamp_dates(&mut self, dataset: &SalesDataset) {
        if let Some((lo, hi)) = dataset.date_bounds {
            self.start = self.start.clamp(lo, hi);
            self.end = self.end.clamp(lo, hi);
        }
    }

    fn date_matches(&self, rec: &SaleRecord) -> bool {
        self.start <= rec.date && rec.date <= self.end
    }

    fn categories_match(&self, rec: &SaleRecord) -> bool {
        Dimension::ALL
            .iter()
            .all(|&dim| self.is_selected(dim, rec.dimension(dim)))
    }
}

/// The values a dimension's multi-select offers.
pub fn options(dataset: &SalesDataset, dim: Dimension) -> Vec<String> {
    if dim == Dimension::Gender {
        return GENDER_OPTIONS.iter().map(|s| s.to_string()).collect();
    }
    dataset
        .unique_values
        .get(&dim)
        .map(|vals| vals.iter().cloned().collect())
        .unwrap_or_default()
}

/// Indices of records inside the selected date range (categories ignored).
pub fn date_filtered_indices(dataset: &SalesDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filters.date_matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of records passing the date range and every categorical filter.
pub fn filtered_indices(dataset: &SalesDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filters.date_matches(rec) && filters.categories_match(rec))
        .map(|(i, _)| i)
        .collect()
}
