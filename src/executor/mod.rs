//! Query execution
//!
//! `HealthQueryExecutor` validates a `HealthQuery`, dispatches it to the
//! handler for its source and times the round trip to the store.
//!
//! # Execution Pipeline
//!
//! ```text
//! HealthQuery → validate → handler → authorize (once per kind)
//!             → translate predicates → NativeQuery → store → ResultRow
//! ```
//!
//! Each handler owns its own authorization cache, so handlers for different
//! sources never wait on each other.

mod auth;
mod category;
mod error;
mod quantity;
mod result;
mod sleep;
mod translator;
mod workout;

pub use auth::AuthorizationCache;
pub use category::CategoryHandler;
pub use error::{ExecutionResult, QueryError};
pub use quantity::QuantityHandler;
pub use result::{QueryResult, ResultRow, ResultValue};
pub use sleep::{group_into_sessions, night_of, SleepSession, SleepSessionHandler};
pub use translator::{sample_sort_key, sort_descriptors, PredicateTranslator};
pub use workout::WorkoutHandler;

use crate::ir::{Clock, Field, HealthQuery, HealthSource, Selection};
use crate::store::{
    HealthStore, NativeQuery, QueryOutput, Sample, SampleQuery, Statistics, StoreError, StoreResult,
};
use std::sync::Arc;
use std::time::Instant;

/// Default statistics window when a grouped query has no date bound
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Executor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Days before now covered by a grouped query with no date predicate
    pub lookback_days: i64,
    pub clock: Clock,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            clock: Clock::System,
        }
    }
}

/// Executes `HealthQuery` values against a `HealthStore`
pub struct HealthQueryExecutor {
    store: Arc<dyn HealthStore>,
    clock: Clock,
    quantity: QuantityHandler,
    category: CategoryHandler,
    workout: WorkoutHandler,
    sleep: SleepSessionHandler,
}

impl HealthQueryExecutor {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self::with_options(store, ExecutorOptions::default())
    }

    pub fn with_options(store: Arc<dyn HealthStore>, options: ExecutorOptions) -> Self {
        Self {
            quantity: QuantityHandler::new(store.clone(), options.clock, options.lookback_days),
            category: CategoryHandler::new(store.clone()),
            workout: WorkoutHandler::new(store.clone()),
            sleep: SleepSessionHandler::new(store.clone()),
            store,
            clock: options.clock,
        }
    }

    /// Clock the handlers resolve "now" against
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Execute a query and return its rows
    pub async fn execute(&self, query: &HealthQuery) -> ExecutionResult<QueryResult> {
        validate(query)?;

        if !self.store.is_available() {
            return Err(QueryError::StoreUnavailable);
        }

        let start = Instant::now();
        let rows = match query.source {
            HealthSource::Quantity(kind) => self.quantity.execute(query, kind).await,
            HealthSource::Category(kind) => self.category.execute(query, kind).await,
            HealthSource::Workout => self.workout.execute(query).await,
            HealthSource::SleepSession => self.sleep.execute(query).await,
        }
        .map_err(QueryError::from)?;
        let elapsed = start.elapsed();

        tracing::debug!(
            source = %query.source,
            rows = rows.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Query executed"
        );

        Ok(QueryResult::new(rows, elapsed))
    }
}

/// Checks that do not need the store
pub fn validate(query: &HealthQuery) -> ExecutionResult<()> {
    if query.selections.is_empty() {
        return Err(QueryError::NoSelections);
    }
    if query.grouping.is_some() && !query.has_aggregate() {
        return Err(QueryError::GroupByRequiresAggregate);
    }
    Ok(())
}

/// Plain field selections, in selection order
fn selected_fields(query: &HealthQuery) -> impl Iterator<Item = Field> + '_ {
    query.selections.iter().filter_map(|selection| match selection {
        Selection::Field(field) => Some(*field),
        Selection::Aggregate(..) => None,
    })
}

/// Columns every sample carries
fn common_column(field: Field, sample: &Sample) -> Option<ResultValue> {
    match field {
        Field::Date => Some(sample.start.into()),
        Field::EndDate => Some(sample.end.into()),
        Field::Source => Some(sample.source.as_str().into()),
        Field::Device => Some(sample.device.as_deref().into()),
        _ => None,
    }
}

async fn fetch_samples(store: &dyn HealthStore, query: SampleQuery) -> StoreResult<Vec<Sample>> {
    let native = NativeQuery::Samples(query);
    tracing::trace!(query_id = %native.id(), kind = %native.kind(), "Fetching samples");
    match store.execute_query(&native).await? {
        QueryOutput::Samples(samples) => Ok(samples),
        QueryOutput::Statistics(_) => Err(StoreError::Query(
            "store answered a sample query with statistics".to_string(),
        )),
    }
}

async fn fetch_statistics(store: &dyn HealthStore, native: &NativeQuery) -> StoreResult<Vec<Statistics>> {
    tracing::trace!(query_id = %native.id(), kind = %native.kind(), "Fetching statistics");
    match store.execute_query(native).await? {
        QueryOutput::Statistics(buckets) => Ok(buckets),
        QueryOutput::Samples(_) => Err(StoreError::Query(
            "store answered a statistics query with samples".to_string(),
        )),
    }
}
