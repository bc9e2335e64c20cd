/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → DeviceDataset (cached per DataSource)
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ DeviceDataset  │  Vec<DeviceRecord>, brand/category index, bounds
///   └───────────────┘
///        │   + SelectionState
///        ▼
///   ┌──────────┐
///   │  filter   │  brand ∧ category ∧ duration → FilteredView
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ summary   │  metrics, reasons, timeline, sorted details
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod summary;
