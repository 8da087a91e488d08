use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::{correlation_matrix, CorrelationMatrix, DashboardView, Selection};
use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::cache::DatasetCache;
use crate::data::filter::{date_filtered_indices, filtered_indices, FilterState};
use crate::data::model::{Dimension, NumericColumn, SalesDataset};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Tabs of the central panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Sales,
    Products,
    Scatter3d,
}

/// User choices of the 3D view.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSettings {
    pub x: Option<NumericColumn>,
    pub y: Option<NumericColumn>,
    pub z: Option<NumericColumn>,
    /// Rotation around the vertical axis, degrees.
    pub yaw: f32,
    /// Elevation of the viewer, degrees.
    pub pitch: f32,
}

impl Default for ScatterSettings {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            z: None,
            yaw: 35.0,
            pitch: 25.0,
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Parsed datasets, kept for the lifetime of the process.
    pub cache: DatasetCache,

    /// File the current dataset came from.
    pub data_path: Option<PathBuf>,

    /// Loaded dataset (None until a file loads successfully).
    pub dataset: Option<Arc<SalesDataset>>,

    /// Filter selections; present whenever `dataset` is.
    pub filters: Option<FilterState>,

    /// Indices inside the date range only.
    pub date_indices: Vec<usize>,

    /// Indices passing every filter (cached).
    pub visible_indices: Vec<usize>,

    /// Aggregates for `visible_indices`.
    pub view: DashboardView,

    /// Correlations over the whole dataset (not affected by filters).
    pub correlation: Option<CorrelationMatrix>,

    pub payment_colors: ColorMap,
    pub product_colors: ColorMap,

    pub active_tab: Tab,
    pub scatter: ScatterSettings,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::default(),
            data_path: None,
            dataset: None,
            filters: None,
            date_indices: Vec::new(),
            visible_indices: Vec::new(),
            view: DashboardView::default(),
            correlation: None,
            payment_colors: ColorMap::default(),
            product_colors: ColorMap::default(),
            active_tab: Tab::default(),
            scatter: ScatterSettings::default(),
            status_message: None,
        }
    }

    /// Load `path` through the cache. On failure the current dataset stays
    /// and the error is shown in the top bar.
    pub fn load_path(&mut self, path: &Path) {
        match self.cache.get_or_load(path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} sales records from {} ({} file(s) cached)",
                    dataset.len(),
                    path.display(),
                    self.cache.len()
                );
                self.set_dataset(path.to_path_buf(), dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Drop the cached copy of the current file (or the configured one when
    /// nothing is loaded yet) and read it again.
    pub fn reload(&mut self) {
        let path = self
            .data_path
            .clone()
            .unwrap_or_else(|| self.config.data_path.clone());
        self.cache.invalidate(&path);
        self.load_path(&path);
    }

    /// Ingest a newly loaded dataset, initialise filters and colours.
    pub fn set_dataset(&mut self, path: PathBuf, dataset: Arc<SalesDataset>) {
        self.filters = Some(FilterState::new(&dataset));
        self.correlation = Some(correlation_matrix(
            &dataset.records,
            &NumericColumn::CORRELATED,
        ));
        self.payment_colors = ColorMap::new(&dataset.unique_values[&Dimension::Payment]);
        self.product_colors = ColorMap::new(&dataset.unique_values[&Dimension::ProductLine]);

        self.dataset = Some(dataset);
        self.data_path = Some(path);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the filtered views and aggregates after a filter change.
    pub fn refilter(&mut self) {
        let (Some(ds), Some(filters)) = (&self.dataset, &mut self.filters) else {
            return;
        };
        filters.clamp_dates(ds);
        self.date_indices = date_filtered_indices(ds, filters);
        self.visible_indices = filtered_indices(ds, filters);
        self.view = DashboardView::build(
            Selection::new(ds, &self.visible_indices),
            self.date_indices.len(),
        );
        log::debug!(
            "Filters matched {} of {} records",
            self.visible_indices.len(),
            ds.len()
        );
    }

    /// The records currently passing every filter.
    pub fn selection(&self) -> Option<Selection<'_>> {
        self.dataset
            .as_deref()
            .map(|ds| Selection::new(ds, &self.visible_indices))
    }

    /// Toggle a single value in a dimension's filter.
    pub fn toggle_filter_value(&mut self, dim: Dimension, value: &str) {
        if let Some(filters) = &mut self.filters {
            filters.toggle(dim, value);
            self.refilter();
        }
    }

    /// Select all values of a dimension.
    pub fn select_all(&mut self, dim: Dimension) {
        if let (Some(ds), Some(filters)) = (&self.dataset, &mut self.filters) {
            filters.select_all(ds, dim);
            self.refilter();
        }
    }

    /// Deselect all values of a dimension.
    pub fn select_none(&mut self, dim: Dimension) {
        if let Some(filters) = &mut self.filters {
            filters.select_none(dim);
            self.refilter();
        }
    }

    /// Back to the full date range with every option selected.
    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.filters = Some(FilterState::new(ds));
            self.refilter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn state_with_data() -> AppState {
        let ds = SalesDataset::from_records(
            vec![
                record("2019-01-01", "Yangon", "Cash", 10.0),
                record("2019-01-02", "Mandalay", "Ewallet", 20.0),
                record("2019-01-03", "Yangon", "Ewallet", 30.0),
            ],
            false,
        );
        let mut state = AppState::new(DashboardConfig::default());
        state.set_dataset(PathBuf::from("sales.csv"), Arc::new(ds));
        state
    }

    #[test]
    fn new_dataset_shows_everything() {
        let state = state_with_data();
        assert_eq!(state.visible_indices, [0, 1, 2]);
        let metrics = state.view.metrics.as_ref().unwrap();
        assert_eq!(metrics.total_sales, 60.0);
        assert_eq!(metrics.transactions, 3);
        assert!(state.correlation.is_some());
    }

    #[test]
    fn filter_changes_recompute_view() {
        let mut state = state_with_data();
        state.toggle_filter_value(Dimension::City, "Yangon");
        assert_eq!(state.visible_indices, [1]);
        assert_eq!(state.view.metrics.as_ref().unwrap().total_sales, 20.0);
        // Transactions only follow the date range.
        assert_eq!(state.view.metrics.as_ref().unwrap().transactions, 3);

        state.select_none(Dimension::Payment);
        assert!(state.visible_indices.is_empty());
        state.reset_filters();
        assert_eq!(state.visible_indices.len(), 3);
    }

    #[test]
    fn failed_load_keeps_current_dataset() {
        let mut state = state_with_data();
        state.load_path(Path::new("/nonexistent/other.csv"));
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
        assert_eq!(state.dataset.as_ref().unwrap().len(), 3);
    }
}
