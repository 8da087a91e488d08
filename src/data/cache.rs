use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::loader::load_file;
use super::model::SalesDataset;

// ---------------------------------------------------------------------------
// Process-lifetime memo of parsed datasets
// ---------------------------------------------------------------------------

/// Parsed datasets keyed by canonical path.
///
/// A path is read from disk at most once until it is invalidated; every
/// filter change afterwards works from the cached `Arc`.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<SalesDataset>>,
}

impl DatasetCache {
    /// Return the cached dataset for `path`, loading it on first use.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<SalesDataset>> {
        let key = canonical(path)?;
        if let Some(ds) = self.entries.get(&key) {
            log::debug!("Dataset cache hit for {}", key.display());
            return Ok(Arc::clone(ds));
        }

        let dataset = load_file(&key).with_context(|| format!("loading {}", key.display()))?;
        let dataset = Arc::new(dataset);
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Forget the cached copy of `path` so the next load re-reads the file.
    pub fn invalidate(&mut self, path: &Path) {
        if let Ok(key) = canonical(path) {
            self.entries.remove(&key);
        }
    }

    /// Number of cached datasets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("resolving {}", path.display()))
}
