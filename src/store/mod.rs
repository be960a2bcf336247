//! Health data stores
//!
//! A `HealthStore` owns the records and answers `NativeQuery` objects built by
//! the executor. Two implementations ship with the crate:
//!
//! - `MemoryStore`: seeded samples, call recording and failure injection
//! - `ExportStore`: records loaded from an Apple Health `export.zip` / `export.xml`

mod error;
mod evaluate;
mod export;
mod memory;
pub mod statistics;
mod types;

use async_trait::async_trait;
use std::collections::HashSet;

pub use error::{StoreError, StoreResult};
pub use evaluate::SampleSet;
pub use export::{parse_export_date, ExportStore, LoadSummary};
pub use memory::MemoryStore;
pub use types::{
    DateWindow, NativeFilter, NativeQuery, QueryOutput, RecordKind, Sample, SampleQuery,
    SampleValue, SortDescriptor, SortKey, Statistics, StatisticsOptions, StatisticsQuery,
    WorkoutDetails, UNKNOWN_SOURCE,
};

/// Access to a device's health records
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Whether health data can be read at all
    fn is_available(&self) -> bool {
        true
    }

    /// Ask for read access to `read`
    async fn request_authorization(&self, read: &HashSet<RecordKind>) -> StoreResult<()>;

    /// Run a query to completion
    async fn execute_query(&self, query: &NativeQuery) -> StoreResult<QueryOutput>;

    /// Release a long-running query
    async fn stop_query(&self, _query: &NativeQuery) -> StoreResult<()> {
        Ok(())
    }
}
