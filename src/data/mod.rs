/// Data layer: core types, loading, inference and transforms.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │   Dataset     │  column list + rows, immutable snapshot
///   └──────────────┘
///        │                         │
///        ▼                         ▼
///   ┌────────────────────┐   ┌───────────┐
///   │ inference / stats   │   │ transform  │  snapshot → new snapshot
///   └────────────────────┘   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ selection  │  features + target → TrainingInput
///   └───────────┘
/// ```

pub mod inference;
pub mod loader;
pub mod model;
pub mod selection;
pub mod stats;
pub mod transform;
