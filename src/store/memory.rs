//! In-memory store
//!
//! Answers queries from a seeded sample set and records every call it
//! receives. Failures can be injected for authorization and queries, and the
//! store can report itself unavailable.

use crate::store::error::{StoreError, StoreResult};
use crate::store::evaluate::SampleSet;
use crate::store::types::{NativeQuery, QueryOutput, RecordKind, Sample};
use crate::store::HealthStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    samples: SampleSet,
    executed: Vec<NativeQuery>,
    stopped: Vec<Uuid>,
    authorization_requests: Vec<HashSet<RecordKind>>,
}

/// `HealthStore` over samples held in memory
#[derive(Debug)]
pub struct MemoryStore {
    available: bool,
    authorization_error: Option<String>,
    query_error: Option<String>,
    stop_error: Option<String>,
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            available: true,
            authorization_error: None,
            query_error: None,
            stop_error: None,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// A store seeded with `samples`
    pub fn with_samples(samples: Vec<Sample>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            state.samples = SampleSet::new(samples);
        }
        store
    }

    /// Report health data as unavailable
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Deny every authorization request with `message`
    pub fn failing_authorization(mut self, message: impl Into<String>) -> Self {
        self.authorization_error = Some(message.into());
        self
    }

    /// Fail every query with `message`
    pub fn failing_queries(mut self, message: impl Into<String>) -> Self {
        self.query_error = Some(message.into());
        self
    }

    /// Fail every `stop_query` with `message`
    pub fn failing_stop(mut self, message: impl Into<String>) -> Self {
        self.stop_error = Some(message.into());
        self
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    // Inspection accessors keep working after a panic in another test thread
    fn inspect(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a sample
    pub fn insert(&self, sample: Sample) -> StoreResult<()> {
        self.lock()?.samples.push(sample);
        Ok(())
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.inspect().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every query passed to `execute_query`, in call order
    pub fn executed_queries(&self) -> Vec<NativeQuery> {
        self.inspect().executed.clone()
    }

    /// Ids of every query passed to `stop_query`
    pub fn stopped_queries(&self) -> Vec<Uuid> {
        self.inspect().stopped.clone()
    }

    /// Read sets of every authorization request, in call order
    pub fn authorization_requests(&self) -> Vec<HashSet<RecordKind>> {
        self.inspect().authorization_requests.clone()
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn request_authorization(&self, read: &HashSet<RecordKind>) -> StoreResult<()> {
        self.lock()?.authorization_requests.push(read.clone());
        match &self.authorization_error {
            Some(message) => Err(StoreError::AuthorizationDenied(message.clone())),
            None => Ok(()),
        }
    }

    async fn execute_query(&self, query: &NativeQuery) -> StoreResult<QueryOutput> {
        let mut state = self.lock()?;
        state.executed.push(query.clone());
        if let Some(message) = &self.query_error {
            return Err(StoreError::Query(message.clone()));
        }
        Ok(state.samples.execute(query))
    }

    async fn stop_query(&self, query: &NativeQuery) -> StoreResult<()> {
        self.lock()?.stopped.push(query.id());
        match &self.stop_error {
            Some(message) => Err(StoreError::Query(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Clock, QuantityType};
    use crate::store::types::SampleQuery;

    fn steps_query() -> NativeQuery {
        NativeQuery::Samples(SampleQuery::new(RecordKind::Quantity(QuantityType::Steps)))
    }

    #[tokio::test]
    async fn test_records_calls() {
        let now = Clock::System.now();
        let store = MemoryStore::with_samples(vec![Sample::quantity(
            QuantityType::Steps,
            10.0,
            now,
            now,
        )]);
        assert_eq!(store.len(), 1);

        let read: HashSet<RecordKind> = [RecordKind::Quantity(QuantityType::Steps)].into();
        store.request_authorization(&read).await.unwrap();

        let query = steps_query();
        let output = store.execute_query(&query).await.unwrap();
        assert!(matches!(output, QueryOutput::Samples(ref s) if s.len() == 1));
        store.stop_query(&query).await.unwrap();

        assert_eq!(store.authorization_requests(), vec![read]);
        assert_eq!(store.executed_queries(), vec![query.clone()]);
        assert_eq!(store.stopped_queries(), vec![query.id()]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new()
            .failing_authorization("denied")
            .failing_queries("boom");

        let err = store.request_authorization(&HashSet::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::AuthorizationDenied(ref m) if m == "denied"));

        let err = store.execute_query(&steps_query()).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(ref m) if m == "boom"));
        // failed queries are still recorded
        assert_eq!(store.executed_queries().len(), 1);
    }

    #[test]
    fn test_unavailable() {
        assert!(MemoryStore::new().is_available());
        assert!(!MemoryStore::new().unavailable().is_available());
    }

    #[test]
    fn test_insert() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        let now = Clock::System.now();
        store
            .insert(Sample::quantity(QuantityType::HeartRate, 60.0, now, now))
            .unwrap();
        assert_eq!(store.len(), 1);
    }
}
