//! Regional weather forecast pipeline for tenki.
//!
//! Resolves a region/office selection against the area hierarchy, fetches the
//! office's forecast document, reshapes it into uniform per-area records and
//! appends them to a SQLite history.

pub mod fetcher;
pub mod hierarchy;
pub mod normalize;
pub mod resolver;
pub mod selection;
pub mod store;
pub mod types;

pub use fetcher::ForecastFetcher;
pub use hierarchy::AreaHierarchyIndex;
pub use normalize::{normalize, AreaRecords, NormalizedForecast};
pub use resolver::{ForecastOutcome, PersistenceStatus, SelectionResolver};
pub use selection::{FetchCompletion, FetchJob, ForecastSession, SelectionCommand, SelectionState};
pub use store::{ForecastStore, PersistSummary, SharedStore, StoredObservation, TableCounts};
pub use types::*;
