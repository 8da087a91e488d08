/// Data layer: core types, loading, caching and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SalesDataset (malformed rows dropped)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  path → Arc<SalesDataset>, kept for the process lifetime
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date range + categorical selections → filtered indices
///   └──────────┘
/// ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
