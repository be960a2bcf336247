//! Per-handler authorization cache

use crate::store::{HealthStore, RecordKind, StoreResult};
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Record kinds a handler has already been granted read access to.
///
/// The lock is held across the store call, so concurrent queries on one
/// handler request each kind at most once.
#[derive(Debug, Default)]
pub struct AuthorizationCache {
    granted: Mutex<HashSet<RecordKind>>,
}

impl AuthorizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request read access to `kind` unless it was granted before.
    ///
    /// A failed request is not cached and will be retried on the next call.
    pub async fn ensure(&self, store: &dyn HealthStore, kind: RecordKind) -> StoreResult<()> {
        let mut granted = self.granted.lock().await;
        if granted.contains(&kind) {
            return Ok(());
        }

        tracing::debug!(kind = %kind, "Requesting read authorization");
        store.request_authorization(&HashSet::from([kind])).await?;
        granted.insert(kind);
        Ok(())
    }

    pub async fn is_granted(&self, kind: RecordKind) -> bool {
        self.granted.lock().await.contains(&kind)
    }
}
